//! Error types for the tool servers.
//!
//! This module defines all error types using `thiserror` for ergonomic error handling.
//! Three families exist, matching how a failure reaches the client:
//!
//! - [`ToolError`]: usage and execution failures of a tool call. These become
//!   JSON-RPC error envelopes.
//! - [`DbError`] and [`FsError`]: resource and policy failures inside a handler.
//!   These never escape the handler; they are rendered as a normal tool result
//!   flagged with `isError` so the agent can read and react to them.

use crate::mcp::protocol::RpcError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Unknown tool: {name}")]
    UnknownTool { name: String },

    #[error("Missing required argument: {name}")]
    MissingArgument { name: String },

    #[error("Invalid argument '{name}': {message}")]
    InvalidArgument { name: String, message: String },

    #[error("Unexpected argument: {name}")]
    UnexpectedArgument { name: String },

    #[error("Invalid arguments: {message}")]
    InvalidArguments { message: String },

    #[error("Timeout: {tool} exceeded {elapsed_secs}s")]
    Timeout { tool: String, elapsed_secs: u64 },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl ToolError {
    /// Create an unknown tool error.
    pub fn unknown_tool(name: impl Into<String>) -> Self {
        Self::UnknownTool { name: name.into() }
    }

    /// Create a missing argument error.
    pub fn missing_argument(name: impl Into<String>) -> Self {
        Self::MissingArgument { name: name.into() }
    }

    /// Create an invalid argument error.
    pub fn invalid_argument(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create an unexpected argument error.
    pub fn unexpected_argument(name: impl Into<String>) -> Self {
        Self::UnexpectedArgument { name: name.into() }
    }

    /// Create an error for arguments that failed typed extraction.
    pub fn invalid_arguments(message: impl Into<String>) -> Self {
        Self::InvalidArguments {
            message: message.into(),
        }
    }

    /// Create a timeout error.
    pub fn timeout(tool: impl Into<String>, elapsed_secs: u64) -> Self {
        Self::Timeout {
            tool: tool.into(),
            elapsed_secs,
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Check if this error is a usage error (bad or missing arguments).
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            Self::MissingArgument { .. }
                | Self::InvalidArgument { .. }
                | Self::UnexpectedArgument { .. }
                | Self::InvalidArguments { .. }
        )
    }
}

/// Result type alias for tool calls.
pub type ToolResult<T> = Result<T, ToolError>;

/// Convert ToolError to a JSON-RPC error object.
///
/// Unknown tools map to "method not found"; everything else raised by a handler
/// maps to the tool execution error code.
impl From<ToolError> for RpcError {
    fn from(err: ToolError) -> Self {
        match &err {
            ToolError::UnknownTool { .. } => RpcError::method_not_found(err.to_string()),
            _ => RpcError::tool_failure(err.to_string()),
        }
    }
}

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Query rejected by safety check: {reason}")]
    QueryRejected { reason: String },

    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    #[error("Database error: {message}")]
    Database {
        message: String,
        /// e.g., "42P01" for undefined table
        sql_state: Option<String>,
        suggestion: String,
    },

    #[error("Timeout: {operation} exceeded {elapsed_secs}s")]
    Timeout {
        operation: String,
        elapsed_secs: u64,
    },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DbError {
    /// Create a rejection carrying the safety checker's reason.
    pub fn query_rejected(reason: impl Into<String>) -> Self {
        Self::QueryRejected {
            reason: reason.into(),
        }
    }

    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a database error with optional SQL state.
    pub fn database(
        message: impl Into<String>,
        sql_state: Option<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Database {
            message: message.into(),
            sql_state,
            suggestion: suggestion.into(),
        }
    }

    /// Create a timeout error.
    pub fn timeout(operation: impl Into<String>, elapsed_secs: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            elapsed_secs,
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            Self::Database { suggestion, .. } => Some(suggestion),
            Self::QueryRejected { .. } => {
                Some("Only single SELECT statements without comments are allowed")
            }
            _ => None,
        }
    }

    /// Message including the SQLSTATE code when the database reported one.
    pub fn detailed_message(&self) -> String {
        match self {
            Self::Database {
                sql_state: Some(code),
                ..
            } => format!("{} (SQLSTATE: {})", self, code),
            _ => self.to_string(),
        }
    }
}

/// Convert sqlx errors to DbError.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => DbError::connection(
                msg.to_string(),
                "Check the connection string format and credentials",
            ),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                DbError::database(
                    db_err.message(),
                    code,
                    "Check the SQL syntax and referenced objects",
                )
            }
            sqlx::Error::RowNotFound => DbError::database(
                "No rows returned",
                None,
                "Verify the query conditions match existing data",
            ),
            sqlx::Error::Io(io_err) => DbError::connection(
                format!("I/O error: {}", io_err),
                "Check network connectivity and database server status",
            ),
            sqlx::Error::Tls(tls_err) => DbError::connection(
                format!("TLS error: {}", tls_err),
                "Verify TLS configuration and certificates",
            ),
            sqlx::Error::Protocol(msg) => DbError::connection(
                format!("Protocol error: {}", msg),
                "Check database server compatibility",
            ),
            sqlx::Error::ColumnNotFound(col) => DbError::database(
                format!("Column not found: {}", col),
                None,
                "Check the column names in the query",
            ),
            sqlx::Error::ColumnDecode { index, source } => {
                DbError::internal(format!("Failed to decode column {}: {}", index, source))
            }
            sqlx::Error::Decode(source) => DbError::internal(format!("Decode error: {}", source)),
            sqlx::Error::WorkerCrashed => DbError::internal("Database worker crashed"),
            _ => DbError::internal(format!("Unknown database error: {}", err)),
        }
    }
}

/// Result type alias for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[derive(Error, Debug)]
pub enum FsError {
    #[error("Access denied: {path} is not inside an allowed directory")]
    AccessDenied { path: String },

    #[error("File does not exist: {path}")]
    NotFound { path: String },

    #[error("Not a regular file: {path}")]
    NotAFile { path: String },

    #[error("Not a directory: {path}")]
    NotADirectory { path: String },

    #[error("File too large: {path} is {size} bytes (limit {limit} bytes)")]
    TooLarge { path: String, size: u64, limit: u64 },

    #[error("File is not valid UTF-8 text: {path}")]
    InvalidUtf8 { path: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("{operation} failed for {path}: {source}")]
    Io {
        operation: &'static str,
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl FsError {
    /// Create an access denied error for a path outside the allow-list.
    pub fn access_denied(path: impl Into<String>) -> Self {
        Self::AccessDenied { path: path.into() }
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Wrap an I/O error, mapping "not found" to its dedicated variant.
    pub fn io(operation: &'static str, path: impl Into<String>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            return Self::NotFound { path };
        }
        Self::Io {
            operation,
            path,
            source,
        }
    }

    /// Check if this error is a policy denial rather than a resource failure.
    pub fn is_denial(&self) -> bool {
        matches!(self, Self::AccessDenied { .. })
    }
}

/// Result type alias for filesystem operations.
pub type FsResult<T> = Result<T, FsError>;
