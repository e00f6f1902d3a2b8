//! Affiliation heuristics.
//!
//! Decides whether a free-text author affiliation names a commercial
//! (biotech/pharma) organisation, and pulls email addresses out of it.
//! Both functions are plain text heuristics with no I/O.

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

/// Lower-case keywords that mark an affiliation as commercial.
///
/// Matched as raw substrings, so "corp" also hits "corporation" and
/// "Princeton" hits "inc".
pub const COMPANY_KEYWORDS: &[&str] = &[
    "inc",
    "ltd",
    "llc",
    "gmbh",
    "corp",
    "corporation",
    "biotech",
    "pharma",
    "therapeutics",
];

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}").expect("Invalid email regex")
});

/// Check if an affiliation contains any company keyword (case-insensitive).
///
/// Empty text is never commercial.
pub fn is_company_affiliation(affiliation: &str) -> bool {
    if affiliation.is_empty() {
        return false;
    }

    let lower = affiliation.to_lowercase();
    COMPANY_KEYWORDS.iter().any(|keyword| lower.contains(keyword))
}

/// Extract the distinct email-like substrings found in `text`.
///
/// Best-effort pattern match, not an address validator.
pub fn extract_emails(text: &str) -> HashSet<String> {
    if text.is_empty() {
        return HashSet::new();
    }

    EMAIL_REGEX
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}
