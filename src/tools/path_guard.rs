//! Directory allow-list for the filesystem tools.
//!
//! Every requested path is canonicalized before the containment check, so `..`
//! segments, trailing separators and symlinks cannot step outside the configured
//! roots. Containment is component-wise: `/data-evil` is not inside `/data`.

use crate::error::{FsError, FsResult};
use std::io;
use std::path::{Component, Path, PathBuf};

/// Canonicalize `path` without requiring it to exist.
///
/// Relative paths resolve against the process working directory. Each existing
/// prefix is resolved through symlinks; components past the first missing one
/// are appended lexically, with `..` popping and `.` skipped. A dangling symlink
/// anywhere along the way is an error.
pub fn canonicalize_lenient(path: &Path) -> io::Result<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    let mut resolved = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => resolved.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                resolved.pop();
            }
            Component::Normal(name) => {
                resolved.push(name);
                match std::fs::canonicalize(&resolved) {
                    Ok(real) => resolved = real,
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {
                        if std::fs::symlink_metadata(&resolved).is_ok() {
                            return Err(io::Error::new(
                                io::ErrorKind::NotFound,
                                format!("dangling symlink: {}", resolved.display()),
                            ));
                        }
                    }
                    Err(e) => return Err(e),
                }
            }
        }
    }

    Ok(resolved)
}

/// True iff `path` canonicalizes to one of `roots` or to a descendant of one.
///
/// `roots` must already be canonical. Canonicalization failures deny.
pub fn is_allowed(path: &str, roots: &[PathBuf]) -> bool {
    resolve_within(Path::new(path), roots).is_some()
}

fn resolve_within(path: &Path, roots: &[PathBuf]) -> Option<PathBuf> {
    let canonical = canonicalize_lenient(path).ok()?;
    roots
        .iter()
        .any(|root| canonical.starts_with(root))
        .then_some(canonical)
}

/// The set of directories the filesystem server may touch.
#[derive(Debug, Clone)]
pub struct AllowedRoots {
    roots: Vec<PathBuf>,
}

impl AllowedRoots {
    /// Canonicalize each configured root. Roots must exist and be directories.
    pub fn new<I, P>(paths: I) -> FsResult<Self>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut roots = Vec::new();
        for path in paths {
            let path = path.as_ref();
            let display = path.display().to_string();
            let canonical = std::fs::canonicalize(path)
                .map_err(|e| FsError::io("canonicalize", display.clone(), e))?;
            if !canonical.is_dir() {
                return Err(FsError::NotADirectory { path: display });
            }
            if !roots.contains(&canonical) {
                roots.push(canonical);
            }
        }

        if roots.is_empty() {
            return Err(FsError::invalid_input(
                "at least one allowed directory is required",
            ));
        }

        Ok(Self { roots })
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    pub fn is_allowed(&self, path: &str) -> bool {
        is_allowed(path, &self.roots)
    }

    /// Canonical form of `path` if it is inside the allow-list.
    pub fn resolve(&self, path: &str) -> FsResult<PathBuf> {
        resolve_within(Path::new(path), &self.roots).ok_or_else(|| FsError::access_denied(path))
    }
}
