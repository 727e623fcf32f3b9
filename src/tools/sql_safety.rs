//! Read-only gate for the `execute_query` tool.
//!
//! A textual heuristic, not a parser: it inspects an upper-cased copy of the
//! statement and denies anything that is not a single `SELECT`. False positives
//! are acceptable (a string literal containing `#` or `DROP` is rejected); false
//! negatives are not.
//!
//! Checks run in a fixed order and the first failing check decides the reason:
//!
//! 1. empty statement
//! 2. leading operation must be `SELECT`
//! 3. denylisted keywords as whole words, in [`FORBIDDEN_KEYWORDS`] order
//! 4. `--` or `#` anywhere in the raw text
//! 5. at most one `;`, and only as the final character

use serde::Serialize;

/// Operations allowed as the leading token.
pub const ALLOWED_OPERATIONS: &[&str] = &["SELECT"];

/// Keywords rejected anywhere in the statement, matched as whole words.
pub const FORBIDDEN_KEYWORDS: &[&str] = &[
    "DROP", "DELETE", "UPDATE", "INSERT", "ALTER", "CREATE", "TRUNCATE", "GRANT", "REVOKE", "EXEC",
];

mod reasons {
    pub const OK: &str = "ok";
    pub const EMPTY: &str = "empty statement";
    pub const COMMENTS: &str = "comments are not allowed";
    pub const MULTIPLE_STATEMENTS: &str = "multiple statements are not allowed";
}

/// Outcome of [`check`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub allowed: bool,
    pub reason: String,
}

impl Verdict {
    fn allow() -> Self {
        Self {
            allowed: true,
            reason: reasons::OK.to_string(),
        }
    }

    fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: reason.into(),
        }
    }
}

/// Decide whether `sql` may be executed.
///
/// # Examples
///
/// ```
/// use mcp_tool_servers::tools::sql_safety::check;
///
/// assert!(check("SELECT * FROM orders").allowed);
/// assert!(!check("DELETE FROM orders").allowed);
/// assert!(!check("SELECT * FROM t -- comment").allowed);
/// ```
pub fn check(sql: &str) -> Verdict {
    let upper = sql.to_uppercase();
    let normalized = upper.trim();

    let Some(operation) = normalized.split_whitespace().next() else {
        return Verdict::deny(reasons::EMPTY);
    };

    if !ALLOWED_OPERATIONS.contains(&operation) {
        return Verdict::deny(format!("operation not allowed: {}", operation));
    }

    if let Some(keyword) = FORBIDDEN_KEYWORDS
        .iter()
        .find(|kw| contains_word(normalized, kw))
    {
        return Verdict::deny(format!("forbidden keyword: {}", keyword));
    }

    if sql.contains("--") || sql.contains('#') {
        return Verdict::deny(reasons::COMMENTS);
    }

    if has_multiple_statements(sql) {
        return Verdict::deny(reasons::MULTIPLE_STATEMENTS);
    }

    Verdict::allow()
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Whole-word occurrence of `word` in `haystack`.
fn contains_word(haystack: &str, word: &str) -> bool {
    haystack.match_indices(word).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + word.len()..].chars().next();
        !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
    })
}

fn has_multiple_statements(sql: &str) -> bool {
    match sql.matches(';').count() {
        0 => false,
        1 => !sql.trim_end().ends_with(';'),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_select_allowed() {
        assert_eq!(check("SELECT 1"), Verdict::allow());
        assert!(check("  select * from orders where id = 3  ").allowed);
    }

    #[test]
    fn test_empty_statement() {
        assert_eq!(check("").reason, "empty statement");
        assert_eq!(check(" \n\t ").reason, "empty statement");
    }

    #[test]
    fn test_leading_operation_must_be_select() {
        let verdict = check("update orders set total = 0");
        assert!(!verdict.allowed);
        assert_eq!(verdict.reason, "operation not allowed: UPDATE");

        assert_eq!(
            check("WITH x AS (SELECT 1) SELECT * FROM x").reason,
            "operation not allowed: WITH"
        );
    }

    #[test]
    fn test_forbidden_keyword_after_select() {
        let verdict = check("SELECT * FROM t; DROP TABLE t");
        assert!(!verdict.allowed);
        assert_eq!(verdict.reason, "forbidden keyword: DROP");
    }

    #[test]
    fn test_denylist_scanned_in_declaration_order() {
        // INSERT appears first in the text but DELETE comes first in the denylist.
        let verdict = check("SELECT insert_me, delete_me, (INSERT), (DELETE) FROM t");
        assert_eq!(verdict.reason, "forbidden keyword: DELETE");
    }

    #[test]
    fn test_keyword_requires_word_boundary() {
        assert!(check("SELECT selected, created_at, updated_by FROM t").allowed);
        assert!(check("SELECT * FROM dropbox_files").allowed);
        assert!(check("SELECT execute_count FROM stats").allowed);
        assert!(!check("SELECT (DROP) FROM t").allowed);
        assert!(!check("SELECT a FROM t WHERE x = 'update'").allowed);
    }

    #[test]
    fn test_comments_rejected() {
        assert_eq!(
            check("SELECT * FROM t -- comment").reason,
            "comments are not allowed"
        );
        assert_eq!(check("SELECT * FROM t # note").reason, "comments are not allowed");
        // Known false positive on literals.
        assert!(!check("SELECT '#1' AS tag").allowed);
    }

    #[test]
    fn test_semicolons() {
        assert!(check("SELECT 1;").allowed);
        assert!(check("SELECT 1;  \n").allowed);
        assert_eq!(
            check("SELECT 1; SELECT 2").reason,
            "multiple statements are not allowed"
        );
        assert_eq!(
            check("SELECT 1;;").reason,
            "multiple statements are not allowed"
        );
    }

    #[test]
    fn test_contains_word_at_edges() {
        assert!(contains_word("DROP", "DROP"));
        assert!(contains_word("X DROP", "DROP"));
        assert!(contains_word("DROP,X", "DROP"));
        assert!(!contains_word("DROPS", "DROP"));
        assert!(!contains_word("_DROP", "DROP"));
        assert!(!contains_word("DROP1", "DROP"));
    }

    #[test]
    fn test_non_ascii_input_does_not_panic() {
        assert!(check("SELECT 'ünïcödé' FROM t").allowed);
        assert!(!check("SELECT 'ß' ; DROP").allowed);
    }
}
