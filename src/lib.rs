//! MCP tool servers.
//!
//! This library provides three independent MCP (Model Context Protocol) tool
//! servers spoken over newline-delimited JSON-RPC on stdio:
//! - `database`: read-only SQL against PostgreSQL or SQLite, behind a statement gate
//! - `filesystem`: file access confined to allow-listed directories
//! - `knowledge`: search over a built-in document set

pub mod config;
pub mod db;
pub mod error;
pub mod mcp;
pub mod models;
pub mod tools;
pub mod transport;

pub use config::Config;
pub use error::{DbError, FsError, ToolError};
pub use mcp::Dispatcher;
