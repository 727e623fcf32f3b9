//! Data models shared by the database tools.

pub mod connection;
pub mod query;
pub mod schema;

pub use connection::{
    ConnectionConfigError, DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_QUERY_TIMEOUT_SECS,
    DEFAULT_SCHEMA, DatabaseConfig, DatabaseType,
};
pub use query::{DEFAULT_ROW_LIMIT, MAX_ROW_LIMIT, QueryResult, apply_row_limit, effective_limit};
pub use schema::{ColumnDefinition, describe_columns};
