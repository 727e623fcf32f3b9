//! Database access layer.
//!
//! - Per-call connections (PostgreSQL and SQLite)
//! - Query execution
//! - Schema introspection
//! - Row decoding into JSON

pub mod connection;
pub mod executor;
pub mod schema;
pub mod types;

pub use connection::DbConnection;
pub use executor::QueryExecutor;
pub use schema::SchemaInspector;
