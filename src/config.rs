//! Command-line configuration.
//!
//! Every server kind is a subcommand; global flags control logging and the
//! per-call timeout. Flags fall back to environment variables where noted.

use crate::mcp::dispatcher::DEFAULT_CALL_TIMEOUT;
use crate::models::{
    ConnectionConfigError, DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_SCHEMA, DatabaseConfig,
};
use crate::tools::filesystem::MAX_READ_BYTES;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_DB_HOST: &str = "localhost";
pub const DEFAULT_DB_PORT: u16 = 5432;
pub const DEFAULT_DB_USER: &str = "postgres";

/// Configuration for the tool servers.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "mcp-tool-servers",
    about = "MCP tool servers over stdio: database queries, filesystem access and knowledge search",
    version
)]
pub struct Config {
    #[command(subcommand)]
    pub server: ServerCommand,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info", env = "MCP_LOG_LEVEL")]
    pub log_level: String,

    /// Enable JSON logging format
    #[arg(long, global = true, env = "MCP_JSON_LOGS")]
    pub json_logs: bool,

    /// Enable logging output to stderr (stdout carries only protocol lines)
    #[arg(long, global = true, env = "MCP_ENABLE_LOGS")]
    pub enable_logs: bool,

    /// Time budget for one tool call, in seconds
    #[arg(
        long,
        global = true,
        default_value_t = DEFAULT_CALL_TIMEOUT.as_secs(),
        env = "MCP_CALL_TIMEOUT"
    )]
    pub call_timeout: u64,
}

impl Config {
    pub fn call_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.call_timeout)
    }
}

#[derive(Debug, Clone, Subcommand)]
pub enum ServerCommand {
    /// Read-only SQL tools against PostgreSQL or SQLite
    Database(DatabaseArgs),
    /// File tools confined to allow-listed directories
    Filesystem(FilesystemArgs),
    /// Search over the built-in knowledge base
    Knowledge,
}

impl ServerCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Database(_) => "database",
            Self::Filesystem(_) => "filesystem",
            Self::Knowledge => "knowledge",
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct DatabaseArgs {
    /// Full connection URL (postgres://... or sqlite:...); overrides the discrete parameters
    #[arg(long, value_name = "URL", env = "DATABASE_URL")]
    pub database_url: Option<String>,

    #[arg(long, default_value = DEFAULT_DB_HOST, env = "PGHOST")]
    pub db_host: String,

    #[arg(long, default_value_t = DEFAULT_DB_PORT, env = "PGPORT")]
    pub db_port: u16,

    #[arg(long, env = "PGDATABASE")]
    pub db_name: Option<String>,

    #[arg(long, default_value = DEFAULT_DB_USER, env = "PGUSER")]
    pub db_user: String,

    #[arg(long, env = "PGPASSWORD", hide_env_values = true)]
    pub db_password: Option<String>,

    /// Schema listed by `list_tables` (PostgreSQL only)
    #[arg(long, default_value = DEFAULT_SCHEMA, env = "MCP_DB_SCHEMA")]
    pub schema: String,

    /// Connection timeout in seconds
    #[arg(
        long,
        default_value_t = DEFAULT_CONNECT_TIMEOUT_SECS,
        env = "MCP_CONNECT_TIMEOUT"
    )]
    pub connect_timeout: u64,

    /// Statement timeout in seconds; defaults to the call timeout
    #[arg(long, env = "MCP_QUERY_TIMEOUT")]
    pub query_timeout: Option<u64>,
}

impl DatabaseArgs {
    /// Build the connection config. `call_timeout` bounds queries when no
    /// explicit statement timeout is set.
    pub fn resolve(&self, call_timeout: Duration) -> Result<DatabaseConfig, ConnectionConfigError> {
        let config = match &self.database_url {
            Some(url) => DatabaseConfig::new(url.as_str())?,
            None => DatabaseConfig::from_parts(
                &self.db_host,
                self.db_port,
                self.db_name.as_deref().unwrap_or_default(),
                &self.db_user,
                self.db_password.as_deref(),
            )?,
        };

        let query_timeout = self
            .query_timeout
            .map(Duration::from_secs)
            .unwrap_or(call_timeout);
        Ok(config
            .with_schema(self.schema.as_str())
            .with_connect_timeout(Duration::from_secs(self.connect_timeout))
            .with_query_timeout(query_timeout))
    }
}

#[derive(Debug, Clone, Args)]
pub struct FilesystemArgs {
    /// Allowed directories; every path must resolve inside one of them
    #[arg(value_name = "ROOT", required = true)]
    pub roots: Vec<PathBuf>,

    /// Largest file `read_file` returns, in bytes
    #[arg(long, default_value_t = MAX_READ_BYTES, env = "MCP_MAX_FILE_SIZE")]
    pub max_file_size: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DatabaseType;

    #[test]
    fn test_filesystem_roots_required() {
        assert!(Config::try_parse_from(["mcp-tool-servers", "filesystem"]).is_err());

        let config =
            Config::try_parse_from(["mcp-tool-servers", "filesystem", "/data", "/srv"]).unwrap();
        match config.server {
            ServerCommand::Filesystem(args) => {
                assert_eq!(args.roots, [PathBuf::from("/data"), PathBuf::from("/srv")]);
                assert_eq!(args.max_file_size, MAX_READ_BYTES);
            }
            other => panic!("unexpected subcommand: {}", other.name()),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let config = Config::try_parse_from([
            "mcp-tool-servers",
            "knowledge",
            "--enable-logs",
            "--call-timeout",
            "5",
        ])
        .unwrap();
        assert!(config.enable_logs);
        assert_eq!(config.call_timeout_duration(), Duration::from_secs(5));
        assert_eq!(config.server.name(), "knowledge");
    }

    #[test]
    fn test_database_url_resolves() {
        let config = Config::try_parse_from([
            "mcp-tool-servers",
            "database",
            "--database-url",
            "sqlite:orders.db",
            "--connect-timeout",
            "3",
        ])
        .unwrap();
        let ServerCommand::Database(args) = config.server else {
            panic!("expected database subcommand");
        };
        let db = args.resolve(Duration::from_secs(30)).unwrap();
        assert_eq!(db.db_type, DatabaseType::SQLite);
        assert_eq!(db.connect_timeout, Duration::from_secs(3));
        assert_eq!(db.query_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_database_parts_resolve() {
        let args = DatabaseArgs {
            database_url: None,
            db_host: "db.internal".to_string(),
            db_port: 5433,
            db_name: Some("sales".to_string()),
            db_user: "reader".to_string(),
            db_password: Some("p@ss".to_string()),
            schema: "reporting".to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT_SECS,
            query_timeout: Some(7),
        };
        let db = args.resolve(Duration::from_secs(30)).unwrap();
        assert_eq!(db.db_type, DatabaseType::PostgreSQL);
        assert_eq!(db.schema, "reporting");
        assert_eq!(db.query_timeout, Duration::from_secs(7));
        assert!(!db.masked_url().contains("p@ss"));
    }

    #[test]
    fn test_database_name_required_without_url() {
        let args = DatabaseArgs {
            database_url: None,
            db_host: DEFAULT_DB_HOST.to_string(),
            db_port: DEFAULT_DB_PORT,
            db_name: None,
            db_user: DEFAULT_DB_USER.to_string(),
            db_password: None,
            schema: DEFAULT_SCHEMA.to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT_SECS,
            query_timeout: None,
        };
        assert!(matches!(
            args.resolve(DEFAULT_CALL_TIMEOUT),
            Err(ConnectionConfigError::MissingDatabaseName)
        ));
    }
}
