//! Query execution engine.
//!
//! Runs one already-vetted statement on an open connection:
//! - prepared (never the simple-query protocol), so PostgreSQL refuses
//!   multi-statement strings on its own
//! - streamed, keeping at most `max_rows` rows
//! - bounded by a per-statement timeout

use crate::db::connection::DbConnection;
use crate::db::types::RowToJson;
use crate::error::{DbError, DbResult};
use crate::models::{DEFAULT_QUERY_TIMEOUT_SECS, MAX_ROW_LIMIT, QueryResult};
use futures_util::StreamExt;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, warn};

/// Query executor that handles database query execution.
#[derive(Debug, Clone)]
pub struct QueryExecutor {
    query_timeout: Duration,
    max_rows: usize,
}

impl QueryExecutor {
    pub fn new(query_timeout: Duration) -> Self {
        Self {
            query_timeout,
            max_rows: MAX_ROW_LIMIT as usize,
        }
    }

    /// Execute a read statement and return its rows as JSON maps.
    pub async fn fetch(&self, conn: &mut DbConnection, sql: &str) -> DbResult<QueryResult> {
        let start = Instant::now();

        debug!(
            sql = %sql,
            max_rows = self.max_rows,
            timeout_secs = self.query_timeout.as_secs(),
            "Executing query"
        );

        match conn {
            DbConnection::Postgres(c) => {
                let rows =
                    postgres::fetch_rows(c, sql, self.max_rows, self.query_timeout).await?;
                Ok(process_rows(rows, self.max_rows, start))
            }
            DbConnection::SQLite(c) => {
                let rows = sqlite::fetch_rows(c, sql, self.max_rows, self.query_timeout).await?;
                Ok(process_rows(rows, self.max_rows, start))
            }
        }
    }
}

impl Default for QueryExecutor {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_QUERY_TIMEOUT_SECS))
    }
}

/// Process rows from any database type into a QueryResult.
fn process_rows<R: RowToJson>(rows: Vec<R>, max_rows: usize, start: Instant) -> QueryResult {
    let execution_time_ms = start.elapsed().as_millis() as u64;

    let Some(first) = rows.first() else {
        return QueryResult {
            execution_time_ms,
            ..QueryResult::default()
        };
    };

    let columns = first.column_names();
    let truncated = rows.len() > max_rows;
    if truncated {
        warn!(limit = max_rows, "Query result truncated");
    }

    QueryResult {
        columns,
        rows: rows.iter().take(max_rows).map(RowToJson::to_json_map).collect(),
        truncated,
        execution_time_ms,
    }
}

// =============================================================================
// Common Helper Functions
// =============================================================================

fn collect_rows<R>(results: Vec<Result<R, sqlx::Error>>) -> DbResult<Vec<R>> {
    results
        .into_iter()
        .map(|r| r.map_err(DbError::from))
        .collect()
}

fn timeout_error(operation: &str, timeout: Duration) -> DbError {
    DbError::timeout(operation, timeout.as_secs())
}

// =============================================================================
// Database-Specific Implementations
// =============================================================================

mod postgres {
    use super::*;
    use sqlx::PgConnection;
    use sqlx::postgres::PgRow;

    pub async fn fetch_rows(
        conn: &mut PgConnection,
        sql: &str,
        max_rows: usize,
        query_timeout: Duration,
    ) -> DbResult<Vec<PgRow>> {
        // One extra row tells us whether the result was cut off.
        let rows_future = sqlx::query(sql)
            .fetch(&mut *conn)
            .take(max_rows + 1)
            .collect::<Vec<_>>();

        match timeout(query_timeout, rows_future).await {
            Ok(results) => collect_rows(results),
            Err(_) => Err(timeout_error("query execution", query_timeout)),
        }
    }
}

mod sqlite {
    use super::*;
    use sqlx::SqliteConnection;
    use sqlx::sqlite::SqliteRow;

    pub async fn fetch_rows(
        conn: &mut SqliteConnection,
        sql: &str,
        max_rows: usize,
        query_timeout: Duration,
    ) -> DbResult<Vec<SqliteRow>> {
        let rows_future = sqlx::query(sql)
            .fetch(&mut *conn)
            .take(max_rows + 1)
            .collect::<Vec<_>>();

        match timeout(query_timeout, rows_future).await {
            Ok(results) => collect_rows(results),
            Err(_) => Err(timeout_error("query execution", query_timeout)),
        }
    }
}
