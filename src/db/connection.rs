//! Per-call database connections.
//!
//! The database server holds no pool: each tool call opens a connection from the
//! [`DatabaseConfig`], uses it, and closes it. Connections are opened read-only
//! (`default_transaction_read_only` on PostgreSQL, `SQLITE_OPEN_READONLY` on
//! SQLite) underneath the textual SQL gate.

use crate::error::{DbError, DbResult};
use crate::models::{DatabaseConfig, DatabaseType};
use sqlx::postgres::PgConnectOptions;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{ConnectOptions, Connection, PgConnection, SqliteConnection};
use std::str::FromStr;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Database-specific connection (avoids AnyConnection limitations).
#[derive(Debug)]
pub enum DbConnection {
    Postgres(PgConnection),
    SQLite(SqliteConnection),
}

impl DbConnection {
    /// Open a read-only connection, bounded by the configured connect timeout.
    pub async fn open(config: &DatabaseConfig) -> DbResult<Self> {
        debug!(
            url = %config.masked_url(),
            db_type = %config.db_type,
            "Opening database connection"
        );

        let connect = async {
            match config.db_type {
                DatabaseType::PostgreSQL => {
                    let options = PgConnectOptions::from_str(&config.url)?
                        .options([("default_transaction_read_only", "on")]);
                    Ok::<_, sqlx::Error>(Self::Postgres(options.connect().await?))
                }
                DatabaseType::SQLite => {
                    let options = SqliteConnectOptions::from_str(&config.url)?.read_only(true);
                    Ok(Self::SQLite(options.connect().await?))
                }
            }
        };

        match timeout(config.connect_timeout, connect).await {
            Ok(Ok(conn)) => Ok(conn),
            Ok(Err(e)) => Err(DbError::connection(
                e.to_string(),
                "Check the database URL, credentials and that the server is reachable",
            )),
            Err(_) => Err(DbError::timeout(
                "connect",
                config.connect_timeout.as_secs(),
            )),
        }
    }

    /// Close the connection. Failures are logged, not returned.
    pub async fn close(self) {
        let db_type = self.db_type();
        let result = match self {
            Self::Postgres(conn) => conn.close().await,
            Self::SQLite(conn) => conn.close().await,
        };
        if let Err(e) = result {
            warn!(db_type = %db_type, error = %e, "Failed to close database connection");
        }
    }

    pub fn db_type(&self) -> DatabaseType {
        match self {
            Self::Postgres(_) => DatabaseType::PostgreSQL,
            Self::SQLite(_) => DatabaseType::SQLite,
        }
    }
}
