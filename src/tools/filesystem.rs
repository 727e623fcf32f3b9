//! Filesystem tool server: `read_file`, `write_file`, `search_files`,
//! `list_directory`.
//!
//! Every path goes through [`AllowedRoots::resolve`] before any I/O. Handlers
//! then work on the canonical path, so the checked path and the touched path
//! are the same.

use crate::error::{FsError, FsResult, ToolError, ToolResult};
use crate::mcp::registry::{ParamSpec, ParamType, ToolDescriptor, ToolRegistry};
use crate::tools::path_guard::AllowedRoots;
use crate::tools::{ToolOutput, ToolService, parse_input};
use humansize::{BINARY, format_size};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Largest file `read_file` returns, in bytes.
pub const MAX_READ_BYTES: u64 = 1024 * 1024;

/// Directory levels below the search root visited by `search_files`.
pub const SEARCH_MAX_DEPTH: usize = 3;

/// Matching files reported by `search_files`.
pub const SEARCH_MAX_RESULTS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilesystemTool {
    ReadFile,
    WriteFile,
    SearchFiles,
    ListDirectory,
}

impl FilesystemTool {
    pub const ALL: [Self; 4] = [
        Self::ReadFile,
        Self::WriteFile,
        Self::SearchFiles,
        Self::ListDirectory,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::ReadFile => "read_file",
            Self::WriteFile => "write_file",
            Self::SearchFiles => "search_files",
            Self::ListDirectory => "list_directory",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.name() == name)
    }

    pub fn descriptor(&self) -> ToolDescriptor {
        match self {
            Self::ReadFile => ToolDescriptor::new(
                self.name(),
                "Read a UTF-8 text file inside an allowed directory (at most 1 MiB).",
            )
            .param(ParamSpec::required(
                "path",
                ParamType::String,
                "Path of the file to read",
            )),
            Self::WriteFile => ToolDescriptor::new(
                self.name(),
                "Write text to a file inside an allowed directory, creating parent \
                 directories and replacing any existing content.",
            )
            .param(ParamSpec::required(
                "path",
                ParamType::String,
                "Path of the file to write",
            ))
            .param(ParamSpec::required(
                "content",
                ParamType::String,
                "Text to write",
            )),
            Self::SearchFiles => ToolDescriptor::new(
                self.name(),
                "Search file contents under a directory for a keyword (case-insensitive, \
                 up to 3 levels deep, at most 20 files reported).",
            )
            .param(ParamSpec::required(
                "directory",
                ParamType::String,
                "Directory to search",
            ))
            .param(ParamSpec::required(
                "keyword",
                ParamType::String,
                "Text to look for",
            )),
            Self::ListDirectory => ToolDescriptor::new(
                self.name(),
                "List the entries of a directory inside an allowed directory.",
            )
            .param(ParamSpec::required(
                "path",
                ParamType::String,
                "Directory to list",
            )),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReadFileInput {
    pub path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReadFileOutput {
    pub path: String,
    pub content: String,
    /// Size in bytes.
    pub size: u64,
    /// Size in characters.
    pub chars: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WriteFileInput {
    pub path: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct WriteFileOutput {
    pub path: String,
    /// Bytes written.
    pub size: u64,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchFilesInput {
    pub directory: String,
    pub keyword: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchMatch {
    pub path: String,
    /// Case-insensitive, non-overlapping occurrences of the keyword.
    pub matches: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchFilesOutput {
    pub directory: String,
    pub keyword: String,
    pub results: Vec<SearchMatch>,
    pub count: usize,
    /// More matching files exist than were reported.
    pub truncated: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListDirectoryInput {
    pub path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
}

#[derive(Debug, Clone, Serialize)]
pub struct DirectoryEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    /// Bytes; files only.
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_human: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListDirectoryOutput {
    pub path: String,
    pub items: Vec<DirectoryEntry>,
}

pub struct FilesystemService {
    roots: AllowedRoots,
    max_read_bytes: u64,
    registry: ToolRegistry,
}

impl FilesystemService {
    pub fn new(roots: AllowedRoots) -> Self {
        Self {
            roots,
            max_read_bytes: MAX_READ_BYTES,
            registry: ToolRegistry::new(
                FilesystemTool::ALL
                    .iter()
                    .map(FilesystemTool::descriptor)
                    .collect(),
            ),
        }
    }

    pub fn with_max_read_bytes(mut self, max_read_bytes: u64) -> Self {
        self.max_read_bytes = max_read_bytes;
        self
    }

    pub fn roots(&self) -> &AllowedRoots {
        &self.roots
    }

    fn guard(&self, path: &str) -> FsResult<PathBuf> {
        let resolved = self.roots.resolve(path);
        if resolved.is_err() {
            warn!(path = %path, "Path outside allowed directories");
        }
        resolved
    }

    pub async fn read_file(&self, input: ReadFileInput) -> FsResult<ReadFileOutput> {
        let path = self.guard(&input.path)?;
        let shown = path.display().to_string();

        let metadata = tokio::fs::metadata(&path)
            .await
            .map_err(|e| FsError::io("stat", shown.clone(), e))?;
        if !metadata.is_file() {
            return Err(FsError::NotAFile { path: shown });
        }
        if metadata.len() > self.max_read_bytes {
            return Err(FsError::TooLarge {
                path: shown,
                size: metadata.len(),
                limit: self.max_read_bytes,
            });
        }

        // Bounded read: the file may have grown since the stat.
        let file = tokio::fs::File::open(&path)
            .await
            .map_err(|e| FsError::io("open", shown.clone(), e))?;
        let mut bytes = Vec::with_capacity(metadata.len().min(self.max_read_bytes) as usize);
        file.take(self.max_read_bytes + 1)
            .read_to_end(&mut bytes)
            .await
            .map_err(|e| FsError::io("read", shown.clone(), e))?;
        if bytes.len() as u64 > self.max_read_bytes {
            return Err(FsError::TooLarge {
                path: shown,
                size: bytes.len() as u64,
                limit: self.max_read_bytes,
            });
        }

        let content =
            String::from_utf8(bytes).map_err(|_| FsError::InvalidUtf8 { path: shown.clone() })?;
        debug!(path = %shown, bytes = content.len(), "Read file");

        Ok(ReadFileOutput {
            path: shown,
            size: content.len() as u64,
            chars: content.chars().count(),
            content,
        })
    }

    /// Write `content`, creating parent directories. Not atomic: a crash
    /// mid-write can leave a truncated file.
    pub async fn write_file(&self, input: WriteFileInput) -> FsResult<WriteFileOutput> {
        let path = self.guard(&input.path)?;
        let shown = path.display().to_string();

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| FsError::io("create directory", parent.display().to_string(), e))?;
        }
        tokio::fs::write(&path, input.content.as_bytes())
            .await
            .map_err(|e| FsError::io("write", shown.clone(), e))?;

        info!(path = %shown, bytes = input.content.len(), "Wrote file");
        Ok(WriteFileOutput {
            path: shown,
            size: input.content.len() as u64,
            message: "file written".to_string(),
        })
    }

    /// `keyword` must be non-empty; `call_tool` rejects an empty one as a usage error.
    pub async fn search_files(&self, input: SearchFilesInput) -> FsResult<SearchFilesOutput> {
        let directory = self.guard(&input.directory)?;
        let shown = directory.display().to_string();

        let metadata = tokio::fs::metadata(&directory)
            .await
            .map_err(|e| FsError::io("stat", shown.clone(), e))?;
        if !metadata.is_dir() {
            return Err(FsError::NotADirectory { path: shown });
        }

        let needle = input.keyword.to_lowercase();
        let max_bytes = self.max_read_bytes;
        let root = directory.clone();
        let (results, truncated) =
            tokio::task::spawn_blocking(move || search_tree(&root, &needle, max_bytes))
                .await
                .map_err(|e| FsError::Io {
                    operation: "search",
                    path: shown.clone(),
                    source: std::io::Error::other(e),
                })?;

        debug!(directory = %shown, matches = results.len(), truncated, "Searched files");
        Ok(SearchFilesOutput {
            directory: shown,
            keyword: input.keyword,
            count: results.len(),
            results,
            truncated,
        })
    }

    pub async fn list_directory(&self, input: ListDirectoryInput) -> FsResult<ListDirectoryOutput> {
        let path = self.guard(&input.path)?;
        let shown = path.display().to_string();

        let metadata = tokio::fs::metadata(&path)
            .await
            .map_err(|e| FsError::io("stat", shown.clone(), e))?;
        if !metadata.is_dir() {
            return Err(FsError::NotADirectory { path: shown });
        }

        let mut reader = tokio::fs::read_dir(&path)
            .await
            .map_err(|e| FsError::io("list", shown.clone(), e))?;
        let mut items = Vec::new();
        while let Some(entry) = reader
            .next_entry()
            .await
            .map_err(|e| FsError::io("list", shown.clone(), e))?
        {
            items.push(directory_entry(&entry).await);
        }
        items.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(ListDirectoryOutput {
            path: shown,
            items,
        })
    }
}

/// Describe one child without following symlinks. A symlink is tagged as a
/// file and carries no size.
async fn directory_entry(entry: &tokio::fs::DirEntry) -> DirectoryEntry {
    let name = entry.file_name().to_string_lossy().into_owned();
    let (kind, size) = match entry.file_type().await {
        Ok(t) if t.is_dir() => (EntryKind::Directory, None),
        Ok(t) if t.is_file() => (EntryKind::File, entry.metadata().await.ok().map(|m| m.len())),
        _ => (EntryKind::File, None),
    };

    DirectoryEntry {
        name,
        kind,
        size,
        size_human: size.map(|bytes| format_size(bytes, BINARY)),
    }
}

/// Walk `root` for files whose content contains `needle` (already lower-cased).
///
/// Symlinks are neither followed nor read. Files that are too large, unreadable
/// or not UTF-8 are skipped. Returns the matches in name order and whether the
/// result cap cut the search short.
fn search_tree(root: &Path, needle: &str, max_bytes: u64) -> (Vec<SearchMatch>, bool) {
    let mut results = Vec::new();
    let walker = WalkDir::new(root)
        .min_depth(1)
        .max_depth(SEARCH_MAX_DEPTH)
        .follow_links(false)
        .sort_by_file_name();

    for entry in walker.into_iter().filter_map(Result::ok) {
        if !entry.file_type().is_file() {
            continue;
        }
        if entry.metadata().map_or(true, |m| m.len() > max_bytes) {
            continue;
        }
        let Ok(content) = std::fs::read_to_string(entry.path()) else {
            continue;
        };

        let matches = content.to_lowercase().matches(needle).count();
        if matches == 0 {
            continue;
        }
        if results.len() == SEARCH_MAX_RESULTS {
            return (results, true);
        }
        results.push(SearchMatch {
            path: entry.path().display().to_string(),
            matches,
        });
    }

    (results, false)
}

fn render<T: Serialize>(tool: FilesystemTool, result: FsResult<T>) -> ToolResult<ToolOutput> {
    match result {
        Ok(value) => ToolOutput::json(&value),
        Err(e) => {
            warn!(tool = tool.name(), error = %e, "Filesystem tool failed");
            let suggestion = e
                .is_denial()
                .then_some("Use a path inside one of the allowed directories");
            Ok(ToolOutput::failure(e.to_string(), suggestion))
        }
    }
}

impl ToolService for FilesystemService {
    fn server_name(&self) -> &'static str {
        "filesystem"
    }

    fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    async fn call_tool(&self, name: &str, arguments: Map<String, Value>) -> ToolResult<ToolOutput> {
        let tool = FilesystemTool::from_name(name).ok_or_else(|| ToolError::unknown_tool(name))?;
        match tool {
            FilesystemTool::ReadFile => {
                render(tool, self.read_file(parse_input(arguments)?).await)
            }
            FilesystemTool::WriteFile => {
                render(tool, self.write_file(parse_input(arguments)?).await)
            }
            FilesystemTool::SearchFiles => {
                let input: SearchFilesInput = parse_input(arguments)?;
                if input.keyword.is_empty() {
                    return Err(ToolError::invalid_argument("keyword", "must not be empty"));
                }
                render(tool, self.search_files(input).await)
            }
            FilesystemTool::ListDirectory => {
                render(tool, self.list_directory(parse_input(arguments)?).await)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn service(dir: &TempDir) -> FilesystemService {
        FilesystemService::new(AllowedRoots::new([dir.path()]).unwrap())
    }

    #[test]
    fn test_tool_names_round_trip() {
        for tool in FilesystemTool::ALL {
            assert_eq!(FilesystemTool::from_name(tool.name()), Some(tool));
        }
        assert_eq!(FilesystemTool::from_name("delete_file"), None);
    }

    #[test]
    fn test_search_tree_depth_limit() {
        let dir = TempDir::new().unwrap();
        let deep = dir.path().join("a/b/c");
        std::fs::create_dir_all(&deep).unwrap();
        std::fs::write(dir.path().join("a/b/level3.txt"), "needle").unwrap();
        std::fs::write(deep.join("level4.txt"), "needle").unwrap();

        let (results, truncated) = search_tree(dir.path(), "needle", MAX_READ_BYTES);
        assert!(!truncated);
        assert_eq!(results.len(), 1);
        assert!(results[0].path.ends_with("level3.txt"));
    }

    #[test]
    fn test_search_tree_caps_results() {
        let dir = TempDir::new().unwrap();
        for i in 0..(SEARCH_MAX_RESULTS + 3) {
            std::fs::write(dir.path().join(format!("f{:02}.txt", i)), "Hit").unwrap();
        }
        let (results, truncated) = search_tree(dir.path(), "hit", MAX_READ_BYTES);
        assert_eq!(results.len(), SEARCH_MAX_RESULTS);
        assert!(truncated);
        assert!(results[0].path.ends_with("f00.txt"));
    }

    #[tokio::test]
    async fn test_read_rejects_oversized_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("big.txt");
        std::fs::write(&path, "x".repeat(64)).unwrap();

        let err = service(&dir)
            .with_max_read_bytes(16)
            .read_file(ReadFileInput {
                path: path.display().to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, FsError::TooLarge { size: 64, limit: 16, .. }));
    }

    #[tokio::test]
    async fn test_read_rejects_invalid_utf8() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bin.dat");
        std::fs::write(&path, [0xFF, 0xFE, 0x00]).unwrap();

        let err = service(&dir)
            .read_file(ReadFileInput {
                path: path.display().to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, FsError::InvalidUtf8 { .. }));
    }

    #[tokio::test]
    async fn test_empty_keyword_is_usage_error() {
        let dir = TempDir::new().unwrap();
        let args = serde_json::json!({
            "directory": dir.path().display().to_string(),
            "keyword": ""
        });
        let err = service(&dir)
            .call_tool("search_files", args.as_object().cloned().unwrap())
            .await
            .unwrap_err();
        assert!(err.is_usage_error());
    }
}
