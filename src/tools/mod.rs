//! Tool servers and their safety gates.
//!
//! Each server kind implements [`ToolService`]:
//! - `database`: `execute_query`, `get_table_schema`, `list_tables`
//! - `filesystem`: `read_file`, `write_file`, `search_files`, `list_directory`
//! - `knowledge`: `search`
//!
//! Gates:
//! - `sql_safety`: read-only statement check for `execute_query`
//! - `path_guard`: directory allow-list for the filesystem tools

pub mod database;
pub mod filesystem;
pub mod format;
pub mod knowledge;
pub mod path_guard;
pub mod sql_safety;

pub use database::{DatabaseService, DatabaseTool};
pub use filesystem::{FilesystemService, FilesystemTool};
pub use knowledge::{KnowledgeService, KnowledgeTool};

use crate::error::{ToolError, ToolResult};
use crate::mcp::protocol::CallToolResult;
use crate::mcp::registry::ToolRegistry;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use std::future::Future;

/// A set of tools served by one process.
pub trait ToolService: Send + Sync {
    /// Reported as `serverInfo.name` during `initialize`.
    fn server_name(&self) -> &'static str;

    fn registry(&self) -> &ToolRegistry;

    /// Run a tool whose arguments already passed descriptor validation.
    ///
    /// Policy denials and resource failures come back as `Ok` outputs flagged
    /// as errors; `Err` is reserved for usage and internal failures.
    fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> impl Future<Output = ToolResult<ToolOutput>> + Send;
}

/// Text payload of a tool call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub text: String,
    pub is_error: bool,
}

impl ToolOutput {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: false,
        }
    }

    /// Pretty-printed JSON of `value`.
    pub fn json<T: Serialize>(value: &T) -> ToolResult<Self> {
        serde_json::to_string_pretty(value)
            .map(Self::text)
            .map_err(|e| ToolError::internal(format!("Failed to serialize output: {}", e)))
    }

    /// A failure the agent should read: `{"error": ..., "suggestion"?: ...}`.
    pub fn failure(message: impl Into<String>, suggestion: Option<&str>) -> Self {
        let mut body = json!({ "error": message.into() });
        if let Some(suggestion) = suggestion {
            body["suggestion"] = json!(suggestion);
        }
        Self {
            text: serde_json::to_string_pretty(&body).unwrap_or_else(|_| body.to_string()),
            is_error: true,
        }
    }
}

impl From<ToolOutput> for CallToolResult {
    fn from(output: ToolOutput) -> Self {
        CallToolResult::text(output.text, output.is_error)
    }
}

/// Deserialize validated arguments into a typed input struct.
pub fn parse_input<T: DeserializeOwned>(arguments: Map<String, Value>) -> ToolResult<T> {
    serde_json::from_value(Value::Object(arguments))
        .map_err(|e| ToolError::invalid_arguments(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Sample {
        path: String,
        #[serde(default)]
        depth: u32,
    }

    #[test]
    fn test_parse_input_with_default() {
        let args = json!({"path": "/tmp"}).as_object().cloned().unwrap();
        let input: Sample = parse_input(args).unwrap();
        assert_eq!(input.path, "/tmp");
        assert_eq!(input.depth, 0);
    }

    #[test]
    fn test_parse_input_type_mismatch_is_usage_error() {
        let args = json!({"path": "/tmp", "depth": -1}).as_object().cloned().unwrap();
        let err = parse_input::<Sample>(args).unwrap_err();
        assert!(err.is_usage_error());
    }

    #[test]
    fn test_failure_output_is_flagged() {
        let output = ToolOutput::failure("Access denied", Some("Use an allowed directory"));
        assert!(output.is_error);
        let body: Value = serde_json::from_str(&output.text).unwrap();
        assert_eq!(body["error"], "Access denied");
        assert_eq!(body["suggestion"], "Use an allowed directory");
    }

    #[test]
    fn test_json_output() {
        let output = ToolOutput::json(&json!({"items": []})).unwrap();
        assert!(!output.is_error);
        assert_eq!(serde_json::from_str::<Value>(&output.text).unwrap(), json!({"items": []}));
    }
}
