use super::NormalizedReport;
use super::matcher::locate;
use crate::fixture::{ExpectedFinding, Keyword};
use crate::severity::Severity;

pub const DEFAULT_WINDOW: usize = 500;

/// Severity the report appears to assign to `finding`, judged from the text
/// preceding the first keyword occurrence. `None` means unknown, never failure.
///
/// A generous window can pick up the heading of an unrelated finding
/// discussed just before this one.
pub fn inferred_severity(report: &str, finding: &ExpectedFinding) -> Option<Severity> {
    infer(&NormalizedReport::new(report), &finding.keywords, DEFAULT_WINDOW)
}

/// Keywords are tried in order; the first that is both located and preceded
/// by a severity marker decides.
pub fn infer(report: &NormalizedReport<'_>, keywords: &[Keyword], window: usize) -> Option<Severity> {
    keywords.iter().find_map(|kw| {
        let hit = locate(report, kw)?;
        highest_marker(&hit.before(window).to_lowercase())
    })
}

/// First severity, scanning CRITICAL down to INFO, whose marker is in `text`.
pub fn highest_marker(text: &str) -> Option<Severity> {
    Severity::PRIORITY
        .into_iter()
        .find(|level| level.is_marked_in(text))
}

/// Slice of `text` spanning `before` characters before byte offset `at` and
/// `after` characters from it, clamped to the text bounds.
pub fn context_window(text: &str, at: usize, before: usize, after: usize) -> &str {
    let start = text[..at]
        .char_indices()
        .rev()
        .take(before)
        .last()
        .map_or(at, |(i, _)| i);
    let end = text[at..]
        .char_indices()
        .nth(after)
        .map_or(text.len(), |(i, _)| at + i);
    &text[start..end]
}
