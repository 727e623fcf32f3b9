//! Query-related data models.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Default row limit for query results.
pub const DEFAULT_ROW_LIMIT: u32 = 100;

/// Maximum allowed row limit.
pub const MAX_ROW_LIMIT: u32 = 10000;

/// Rows returned by a read query, keyed by column name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryResult {
    /// Column names in select-list order. Empty when no rows came back.
    pub columns: Vec<String>,
    pub rows: Vec<serde_json::Map<String, JsonValue>>,
    /// True when the statement produced more rows than the executor keeps.
    pub truncated: bool,
    pub execution_time_ms: u64,
}

impl QueryResult {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Cap a caller-supplied row limit at `MAX_ROW_LIMIT`. Zero stays zero.
pub fn effective_limit(limit: u32) -> u32 {
    limit.min(MAX_ROW_LIMIT)
}

/// Append `LIMIT <limit>` unless the statement already mentions `LIMIT`.
///
/// The check is a case-insensitive substring test. A single trailing `;` is
/// dropped first so the clause lands inside the statement. Returns the SQL to
/// execute and whether a limit was added.
pub fn apply_row_limit(sql: &str, limit: u32) -> (String, bool) {
    if sql.to_uppercase().contains("LIMIT") {
        return (sql.to_string(), false);
    }
    let trimmed = sql.trim_end();
    let body = trimmed.strip_suffix(';').unwrap_or(trimmed).trim_end();
    (format!("{} LIMIT {}", body, limit), true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_appended() {
        assert_eq!(
            apply_row_limit("SELECT * FROM orders", 2),
            ("SELECT * FROM orders LIMIT 2".to_string(), true)
        );
    }

    #[test]
    fn test_existing_limit_untouched() {
        let sql = "SELECT * FROM orders limit 1";
        assert_eq!(apply_row_limit(sql, 100), (sql.to_string(), false));
    }

    #[test]
    fn test_trailing_semicolon_removed_before_limit() {
        assert_eq!(
            apply_row_limit("SELECT 1 ;  \n", 5).0,
            "SELECT 1 LIMIT 5"
        );
    }

    #[test]
    fn test_effective_limit_bounds() {
        assert_eq!(effective_limit(0), 0);
        assert_eq!(effective_limit(DEFAULT_ROW_LIMIT), DEFAULT_ROW_LIMIT);
        assert_eq!(effective_limit(99999), MAX_ROW_LIMIT);
    }

    #[test]
    fn test_query_result_counts() {
        let result = QueryResult::default();
        assert!(result.is_empty());
        assert_eq!(result.row_count(), 0);
    }
}
