//! `[FK: table.column]` relationship-hint extraction from comments.

use regex::Regex;
use std::sync::OnceLock;

fn fk_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)\[FK:\s*(\w+)\.(\w+)\]").expect("valid FK pattern"))
}

/// Split a column comment into a business description and an optional hinted
/// reference `(table, column)`. The bracket tag is stripped from the
/// description; a comment that was only a tag yields no description.
pub fn parse_comment(comment: &str) -> (Option<String>, Option<(String, String)>) {
    let reference = fk_pattern()
        .captures(comment)
        .map(|caps| (caps[1].to_string(), caps[2].to_string()));

    let description = fk_pattern().replace_all(comment, "").trim().to_string();
    let description = if description.is_empty() {
        None
    } else {
        Some(description)
    };

    (description, reference)
}
