//! Read-only enforcement gate for generated SQL.
//!
//! This is the single authority for "is this safe to run"; nothing else
//! re-implements the check. The rules are deliberately conservative: a
//! false positive that blocks a legitimate SELECT mentioning "delete" in a
//! literal is acceptable, a false negative that lets a write through is
//! not.

use regex::Regex;
use std::sync::OnceLock;

use scout_core::{Result, ScoutError};

/// Statements that should never be executed, matched anywhere in the text
/// on a word boundary, case-insensitively.
const WRITE_KEYWORDS: &str = "INSERT|UPDATE|DELETE|DROP|ALTER|TRUNCATE|CREATE|GRANT|REVOKE|MERGE|COPY|UNLOAD|CALL|COMMENT|VACUUM";

fn write_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(&format!(r"(?i)\b({})\b", WRITE_KEYWORDS)).expect("valid keyword pattern")
    })
}

/// Validate that `sql` is a single read-only SELECT statement.
pub fn validate(sql: &str) -> Result<()> {
    let trimmed = sql.trim();
    if trimmed.is_empty() {
        return Err(ScoutError::safety("empty statement"));
    }

    let first = trimmed
        .split_whitespace()
        .next()
        .unwrap_or("")
        .trim_start_matches('(')
        .to_uppercase();
    // WITH is the CTE prologue of a SELECT; anything else writable is
    // caught by the keyword scan below.
    if first != "SELECT" && first != "WITH" {
        return Err(ScoutError::safety(format!(
            "statement must start with SELECT, found {}",
            first
        )));
    }

    // One optional trailing terminator is fine; anything after it is
    // statement stacking.
    let body = trimmed.strip_suffix(';').unwrap_or(trimmed);
    if body.contains(';') {
        return Err(ScoutError::safety("multiple statements are not allowed"));
    }

    if let Some(found) = write_pattern().find(body) {
        return Err(ScoutError::safety(format!(
            "write keyword {} is not allowed",
            found.as_str().to_uppercase()
        )));
    }

    Ok(())
}
