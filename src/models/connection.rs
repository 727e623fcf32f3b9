//! Connection-related data models.
//!
//! The database server opens one connection per tool call from an explicit
//! [`DatabaseConfig`]; nothing here is process-global.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Default connect timeout in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default per-statement timeout in seconds.
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 30;

/// Default schema searched by `list_tables` and `get_table_schema` on PostgreSQL.
pub const DEFAULT_SCHEMA: &str = "public";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DatabaseType {
    PostgreSQL,
    SQLite,
}

impl DatabaseType {
    /// Parse database type from a connection string.
    pub fn from_connection_string(connection_string: &str) -> Option<Self> {
        let lower = connection_string.to_lowercase();
        if lower.starts_with("postgres://") || lower.starts_with("postgresql://") {
            Some(Self::PostgreSQL)
        } else if lower.starts_with("sqlite:") {
            Some(Self::SQLite)
        } else {
            None
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::PostgreSQL => "PostgreSQL",
            Self::SQLite => "SQLite",
        }
    }
}

impl std::fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConnectionConfigError {
    #[error("Unsupported database URL scheme (expected postgres:// or sqlite:): {0}")]
    UnsupportedScheme(String),

    #[error("Invalid connection URL: {0}")]
    InvalidUrl(String),

    #[error("Missing database name: set --database-url or --db-name (PGDATABASE)")]
    MissingDatabaseName,
}

/// Everything needed to open a connection for one tool call.
#[derive(Clone, Serialize)]
pub struct DatabaseConfig {
    /// Contains credentials - never log; use [`DatabaseConfig::masked_url`].
    #[serde(skip_serializing)]
    pub url: String,
    pub db_type: DatabaseType,
    pub schema: String,
    pub connect_timeout: Duration,
    pub query_timeout: Duration,
}

impl DatabaseConfig {
    /// Build a config from a connection URL with default timeouts and schema.
    pub fn new(url: impl Into<String>) -> Result<Self, ConnectionConfigError> {
        let url = url.into();
        let db_type = DatabaseType::from_connection_string(&url)
            .ok_or_else(|| ConnectionConfigError::UnsupportedScheme(mask_password(&url)))?;

        if db_type == DatabaseType::PostgreSQL {
            Url::parse(&url).map_err(|e| ConnectionConfigError::InvalidUrl(e.to_string()))?;
        }

        Ok(Self {
            url,
            db_type,
            schema: DEFAULT_SCHEMA.to_string(),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            query_timeout: Duration::from_secs(DEFAULT_QUERY_TIMEOUT_SECS),
        })
    }

    /// Build a PostgreSQL URL from discrete parameters.
    ///
    /// User name and password are percent-encoded by `url`.
    pub fn from_parts(
        host: &str,
        port: u16,
        database: &str,
        user: &str,
        password: Option<&str>,
    ) -> Result<Self, ConnectionConfigError> {
        if database.is_empty() {
            return Err(ConnectionConfigError::MissingDatabaseName);
        }

        let invalid = |what: &str| ConnectionConfigError::InvalidUrl(what.to_string());
        let mut url = Url::parse("postgres://localhost")
            .map_err(|e| ConnectionConfigError::InvalidUrl(e.to_string()))?;
        url.set_host(Some(host))
            .map_err(|e| ConnectionConfigError::InvalidUrl(format!("host: {}", e)))?;
        url.set_port(Some(port)).map_err(|_| invalid("port"))?;
        url.set_username(user).map_err(|_| invalid("user"))?;
        url.set_password(password).map_err(|_| invalid("password"))?;
        url.set_path(database);

        Self::new(url.to_string())
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = schema.into();
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    /// The connection URL with any password replaced by `****`.
    pub fn masked_url(&self) -> String {
        mask_password(&self.url)
    }
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &self.masked_url())
            .field("db_type", &self.db_type)
            .field("schema", &self.schema)
            .field("connect_timeout", &self.connect_timeout)
            .field("query_timeout", &self.query_timeout)
            .finish()
    }
}

fn mask_password(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut url) if url.password().is_some() => {
            if url.set_password(Some("****")).is_ok() {
                url.to_string()
            } else {
                raw.to_string()
            }
        }
        _ => raw.to_string(),
    }
}
