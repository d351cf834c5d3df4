//! Read-only statement guard
//!
//! Model output is untrusted. Even after sanitization a model can still emit
//! `DELETE`, `DROP` or `SELECT ... INTO`, so every statement is checked
//! before it reaches the database:
//!
//! - it must start with `SELECT` or `WITH`
//! - it must not contain a data-modifying or DDL keyword
//! - it must be a single statement
//!
//! String literals, quoted identifiers and comments are blanked out first so
//! that `WHERE title = 'delete me'` is not a false positive.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z_][A-Za-z0-9_$]*").unwrap());

/// Errors raised for rejected statements
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GuardError {
    #[error("Empty statement")]
    Empty,

    #[error("Statement must start with SELECT or WITH, found {found}")]
    NotReadOnly { found: String },

    #[error("Forbidden keyword: {keyword}")]
    ForbiddenKeyword { keyword: String },

    #[error("Multiple statements are not allowed")]
    MultipleStatements,

    #[error("Unterminated literal or comment")]
    Unterminated,
}

pub type Result<T> = std::result::Result<T, GuardError>;

/// Configuration for the guard
#[derive(Debug, Clone)]
pub struct GuardConfig {
    /// Keywords a statement may start with
    pub allowed_leading: Vec<String>,
    /// Keywords that may not appear anywhere in the statement
    pub forbidden_keywords: Vec<String>,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            allowed_leading: ["SELECT", "WITH"].iter().map(|s| s.to_string()).collect(),
            forbidden_keywords: [
                "INSERT", "UPDATE", "DELETE", "MERGE", "UPSERT", "DROP", "ALTER", "CREATE",
                "TRUNCATE", "GRANT", "REVOKE", "COPY", "VACUUM", "ANALYZE", "CALL", "DO",
                "LOCK", "COMMENT", "REINDEX", "CLUSTER", "REFRESH", "SET", "RESET", "LISTEN",
                "NOTIFY", "PREPARE", "EXECUTE", "DEALLOCATE", "DISCARD", "INTO",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

/// Checks sanitized SQL before execution
#[derive(Debug, Clone, Default)]
pub struct SqlGuard {
    config: GuardConfig,
}

impl SqlGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: GuardConfig) -> Self {
        Self { config }
    }

    /// Accept the statement or explain why it was rejected.
    pub fn check(&self, sql: &str) -> Result<()> {
        let code = strip_literals_and_comments(sql)?;

        let body = code.trim().trim_end_matches(|c: char| c == ';' || c.is_whitespace());
        if body.contains(';') {
            return Err(GuardError::MultipleStatements);
        }

        let mut words = WORD.find_iter(body).map(|m| m.as_str().to_uppercase());

        let first = words.next().ok_or(GuardError::Empty)?;
        if !self.config.allowed_leading.iter().any(|k| *k == first) {
            return Err(GuardError::NotReadOnly { found: first });
        }

        for word in std::iter::once(first).chain(words) {
            if self.config.forbidden_keywords.iter().any(|k| *k == word) {
                return Err(GuardError::ForbiddenKeyword { keyword: word });
            }
        }

        Ok(())
    }
}

/// Replace string literals, quoted identifiers and comments with spaces.
fn strip_literals_and_comments(sql: &str) -> Result<String> {
    let mut out = String::with_capacity(sql.len());
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\'' | '"' => {
                // doubled quote is an escaped quote inside the literal
                let quote = c;
                let mut closed = false;
                while let Some(inner) = chars.next() {
                    if inner == quote {
                        if chars.peek() == Some(&quote) {
                            chars.next();
                            continue;
                        }
                        closed = true;
                        break;
                    }
                }
                if !closed {
                    return Err(GuardError::Unterminated);
                }
                out.push(' ');
            }
            '-' if chars.peek() == Some(&'-') => {
                for inner in chars.by_ref() {
                    if inner == '\n' {
                        break;
                    }
                }
                out.push(' ');
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut closed = false;
                while let Some(inner) = chars.next() {
                    if inner == '*' && chars.peek() == Some(&'/') {
                        chars.next();
                        closed = true;
                        break;
                    }
                }
                if !closed {
                    return Err(GuardError::Unterminated);
                }
                out.push(' ');
            }
            other => out.push(other),
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_selects_pass() {
        let guard = SqlGuard::new();
        assert!(guard.check("SELECT COUNT(*) FROM videos;").is_ok());
        assert!(guard
            .check("SELECT COALESCE(SUM(delta_views_count),0)\nFROM video_snapshots\nWHERE DATE(created_at) = '2025-11-28';")
            .is_ok());
        assert!(guard
            .check("with d as (select video_id, max(views_count) v from video_snapshots group by video_id) select sum(v) from d")
            .is_ok());
        assert!(guard
            .check("SELECT COUNT(*) FROM videos WHERE creator_id::text = '42';")
            .is_ok());
    }

    #[test]
    fn test_data_modifying_rejected() {
        let guard = SqlGuard::new();
        assert_eq!(
            guard.check("DELETE FROM videos;"),
            Err(GuardError::NotReadOnly { found: "DELETE".to_string() })
        );
        assert!(matches!(guard.check("drop table videos"), Err(GuardError::NotReadOnly { .. })));
        assert!(matches!(guard.check("UPDATE videos SET views_count = 0"), Err(GuardError::NotReadOnly { .. })));
    }

    #[test]
    fn test_hidden_modification_rejected() {
        let guard = SqlGuard::new();
        assert_eq!(
            guard.check("SELECT * INTO backup FROM videos"),
            Err(GuardError::ForbiddenKeyword { keyword: "INTO".to_string() })
        );
        assert_eq!(
            guard.check("WITH gone AS (DELETE FROM videos RETURNING id) SELECT COUNT(*) FROM gone"),
            Err(GuardError::ForbiddenKeyword { keyword: "DELETE".to_string() })
        );
    }

    #[test]
    fn test_keywords_inside_literals_ignored() {
        let guard = SqlGuard::new();
        assert!(guard.check("SELECT COUNT(*) FROM videos WHERE creator_id::text = 'drop'").is_ok());
        assert!(guard.check("SELECT COUNT(*) AS \"delete\" FROM videos").is_ok());
        assert!(guard.check("SELECT 'it''s; update' AS x").is_ok());
        assert!(guard.check("SELECT 1 -- update later\n").is_ok());
        assert!(guard.check("SELECT /* insert */ 1").is_ok());
    }

    #[test]
    fn test_identifiers_containing_keywords_pass() {
        let guard = SqlGuard::new();
        assert!(guard.check("SELECT MAX(updated_at) FROM videos").is_ok());
        assert!(guard.check("SELECT COUNT(*) FROM videos WHERE created_at >= '2025-11-01'").is_ok());
    }

    #[test]
    fn test_multiple_statements_rejected() {
        let guard = SqlGuard::new();
        assert_eq!(
            guard.check("SELECT 1; SELECT 2"),
            Err(GuardError::MultipleStatements)
        );
        assert!(guard.check("SELECT 1;").is_ok());
    }

    #[test]
    fn test_empty_and_unterminated() {
        let guard = SqlGuard::new();
        assert_eq!(guard.check("  ;"), Err(GuardError::Empty));
        assert_eq!(guard.check("SELECT 'oops"), Err(GuardError::Unterminated));
        assert_eq!(guard.check("SELECT /* oops"), Err(GuardError::Unterminated));
    }

    #[test]
    fn test_custom_config() {
        let guard = SqlGuard::with_config(GuardConfig {
            allowed_leading: vec!["SELECT".to_string()],
            forbidden_keywords: vec![],
        });
        assert!(matches!(guard.check("WITH x AS (SELECT 1) SELECT * FROM x"), Err(GuardError::NotReadOnly { .. })));
        assert!(guard.check("SELECT * INTO t FROM videos").is_ok());
    }
}
