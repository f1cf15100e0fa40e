//! # Summarizer
//!
//! The heuristic summarizer: a deterministic cut of the abstract.

use crate::models::PaperSummary;

/// Longest summary body, in characters, before the ellipsis.
pub const MAX_SUMMARY_CHARS: usize = 150;

/// Appended when the abstract had to be cut.
pub const ELLIPSIS: &str = "...";

/// Returned when the API gave us nothing to summarize.
pub const NO_ABSTRACT: &str = "No abstract available.";

/// Summarize an abstract by truncation.
///
/// # Rust Concept: Characters vs Bytes
///
/// `str::len()` counts bytes. Abstracts regularly contain non-ASCII text
/// (Greek letters, accented author names), so the limit is applied with
/// `chars()` to avoid slicing through a multi-byte character.
pub fn summarize_abstract(abstract_text: Option<&str>) -> PaperSummary {
    let summary = match abstract_text {
        None | Some("") => NO_ABSTRACT.to_string(),
        Some(text) => match text.char_indices().nth(MAX_SUMMARY_CHARS) {
            Some((cut, _)) => format!("{}{}", &text[..cut], ELLIPSIS),
            None => text.to_string(),
        },
    };

    PaperSummary { summary }
}

/// Whether `summary` satisfies the length contract reported to callers.
pub fn within_limit(summary: &str) -> bool {
    let body = summary.strip_suffix(ELLIPSIS).unwrap_or(summary);
    body.chars().count() <= MAX_SUMMARY_CHARS
}
