//! Normalisation of raw model output into one SQL statement
//!
//! Steps, in order:
//!
//! 1. trim
//! 2. drop a leading ```` ``` ```` / ```` ```sql ```` fence and a trailing fence
//! 3. drop one pair of inline backticks wrapping the whole text
//! 4. drop a leading `SQL:` / `Ответ:` label (and inline backticks it was hiding)
//! 5. keep only the first statement, terminated by a single `;`
//! 6. rewrite `creator_id = '<value>'` to a text comparison unless the value
//!    is a canonical UUID
//!
//! The result is stable under repeated application.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static FENCE_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^```(?:sql)?\s*").unwrap());

static FENCE_CLOSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*```$").unwrap());

static ANSWER_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?:sql|ответ)\s*:\s*").unwrap());

static CREATOR_EQ: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bcreator_id\s*=\s*'([^']+)'").unwrap());

static UUID_TEXT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
        .unwrap()
});

/// Whether `value` is a UUID in canonical hyphenated text form.
pub fn is_canonical_uuid(value: &str) -> bool {
    UUID_TEXT.is_match(value)
}

fn strip_inline_code(sql: String) -> String {
    if sql.len() >= 2 && sql.starts_with('`') && sql.ends_with('`') {
        sql[1..sql.len() - 1].trim().to_string()
    } else {
        sql
    }
}

/// Turn raw completion text into at most one SQL statement.
pub fn sanitize_sql(raw: &str) -> String {
    let sql = raw.trim();

    let sql = FENCE_OPEN.replace(sql, "");
    let sql = FENCE_CLOSE.replace(&sql, "").into_owned();

    let sql = strip_inline_code(sql);

    // a label in front of inline code ("Ответ: `SELECT ...`") hides the backticks from step 3
    let label_end = ANSWER_LABEL.find(&sql).map(|m| m.end());
    let sql = match label_end {
        Some(end) => strip_inline_code(sql[end..].trim().to_string()),
        None => sql,
    };

    let sql = if sql.contains(';') {
        match sql.split(';').map(str::trim).find(|s| !s.is_empty()) {
            Some(first) => format!("{};", first),
            None => sql,
        }
    } else {
        sql
    };

    CREATOR_EQ
        .replace_all(&sql, |caps: &Captures| {
            let value = &caps[1];
            if is_canonical_uuid(value) {
                format!("creator_id = '{}'", value)
            } else {
                format!("creator_id::text = '{}'", value)
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    const UUID: &str = "8b9c2d4e-1111-4c3b-9a7e-5d6f7a8b9c0d";

    #[test]
    fn test_plain_statement_untouched() {
        assert_eq!(
            sanitize_sql("SELECT COUNT(*) FROM videos;"),
            "SELECT COUNT(*) FROM videos;"
        );
        assert_eq!(
            sanitize_sql("  SELECT COUNT(*) FROM videos \n"),
            "SELECT COUNT(*) FROM videos"
        );
    }

    #[test]
    fn test_sql_fence_removed() {
        let inner = "SELECT COALESCE(SUM(delta_views_count),0)\nFROM video_snapshots\nWHERE DATE(created_at) = '2025-11-28';";
        let raw = format!("```sql\n{}\n```", inner);
        assert_eq!(sanitize_sql(&raw), inner);
    }

    #[test]
    fn test_fence_tag_case_insensitive() {
        assert_eq!(sanitize_sql("```SQL\nSELECT 1;\n```"), "SELECT 1;");
        assert_eq!(sanitize_sql("```\nSELECT 1;\n```"), "SELECT 1;");
    }

    #[test]
    fn test_inline_backticks_removed() {
        assert_eq!(sanitize_sql("`SELECT COUNT(*) FROM videos;`"), "SELECT COUNT(*) FROM videos;");
        // only one pair is stripped
        assert_eq!(sanitize_sql("``SELECT 1``"), "`SELECT 1`");
    }

    #[test]
    fn test_labels_removed() {
        assert_eq!(sanitize_sql("SQL: SELECT 1;"), "SELECT 1;");
        assert_eq!(sanitize_sql("sql :SELECT 1;"), "SELECT 1;");
        assert_eq!(sanitize_sql("Ответ: SELECT COUNT(*) FROM videos;"), "SELECT COUNT(*) FROM videos;");
        assert_eq!(sanitize_sql("ОТВЕТ : SELECT 1;"), "SELECT 1;");
        assert_eq!(sanitize_sql("Ответ: `SELECT 1;`"), "SELECT 1;");
    }

    #[test]
    fn test_only_first_statement_kept() {
        assert_eq!(
            sanitize_sql("SELECT COUNT(*) FROM videos; DROP TABLE videos;"),
            "SELECT COUNT(*) FROM videos;"
        );
        assert_eq!(
            sanitize_sql("SELECT 1;\n\nЭтот запрос считает количество видео."),
            "SELECT 1;"
        );
        assert_eq!(sanitize_sql("SELECT 1;;;"), "SELECT 1;");
    }

    #[test]
    fn test_leading_separator_skipped() {
        assert_eq!(sanitize_sql("; SELECT 1; SELECT 2;"), "SELECT 1;");
    }

    #[test]
    fn test_numeric_creator_id_compared_as_text() {
        let sql = sanitize_sql("SELECT COUNT(*) FROM videos WHERE creator_id = '42';");
        assert_eq!(sql, "SELECT COUNT(*) FROM videos WHERE creator_id::text = '42';");

        let sql = sanitize_sql("SELECT COUNT(*) FROM videos v WHERE v.CREATOR_ID='42'");
        assert_eq!(sql, "SELECT COUNT(*) FROM videos v WHERE v.creator_id::text = '42'");
    }

    #[test]
    fn test_uuid_creator_id_left_as_identity() {
        let raw = format!("SELECT COUNT(*) FROM videos WHERE creator_id = '{}';", UUID);
        assert_eq!(sanitize_sql(&raw), raw);

        let compact = format!("SELECT COUNT(*) FROM videos WHERE creator_id='{}';", UUID);
        assert_eq!(
            sanitize_sql(&compact),
            format!("SELECT COUNT(*) FROM videos WHERE creator_id = '{}';", UUID)
        );
    }

    #[test]
    fn test_every_occurrence_rewritten() {
        let raw = format!(
            "SELECT COUNT(*) FROM videos WHERE creator_id = '42' OR creator_id = '{}' OR creator_id = 'abc'",
            UUID
        );
        let sql = sanitize_sql(&raw);
        assert!(sql.contains("creator_id::text = '42'"));
        assert!(sql.contains(&format!("creator_id = '{}'", UUID)));
        assert!(sql.contains("creator_id::text = 'abc'"));
    }

    #[test]
    fn test_similar_column_not_rewritten() {
        let sql = sanitize_sql("SELECT COUNT(*) FROM t WHERE other_creator_id = '42'");
        assert_eq!(sql, "SELECT COUNT(*) FROM t WHERE other_creator_id = '42'");
    }

    #[test]
    fn test_combined_noise() {
        let raw = "```sql\nSQL: SELECT COUNT(*) FROM videos WHERE creator_id = '7';\nSELECT 2;\n```";
        assert_eq!(
            sanitize_sql(raw),
            "SELECT COUNT(*) FROM videos WHERE creator_id::text = '7';"
        );
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            "```sql\nSELECT COUNT(*) FROM videos;\n```".to_string(),
            "SELECT COUNT(*) FROM videos WHERE creator_id = '42'; DELETE FROM videos;".to_string(),
            format!("Ответ: `SELECT COUNT(*) FROM videos WHERE creator_id='{}'`", UUID),
            "SELECT SUM(views_count) FROM videos".to_string(),
            ";;;".to_string(),
            String::new(),
        ];
        for raw in inputs {
            let once = sanitize_sql(&raw);
            assert_eq!(sanitize_sql(&once), once, "not idempotent for {:?}", raw);
        }
    }

    #[test]
    fn test_uuid_detection() {
        assert!(is_canonical_uuid(UUID));
        assert!(is_canonical_uuid(&UUID.to_uppercase()));
        assert!(!is_canonical_uuid("42"));
        assert!(!is_canonical_uuid("8b9c2d4e11114c3b9a7e5d6f7a8b9c0d"));
        assert!(!is_canonical_uuid("8b9c2d4e-1111-4c3b-9a7e-5d6f7a8b9c0"));
    }
}
