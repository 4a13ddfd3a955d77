//! Scoring core: decides, from report text alone, which expected findings a
//! report surfaced and which benign patterns it over-escalated.
//!
//! Everything here is pure. The same report scored against the same suite
//! always yields an identical [`SuiteScore`].

pub mod false_positive;
pub mod inference;
pub mod matcher;
pub mod suite;

use serde::{Deserialize, Serialize};

pub use false_positive::is_false_positive;
pub use inference::inferred_severity;
pub use matcher::detected;
pub use suite::{
    FalsePositiveOutcome, FalsePositiveResult, FindingOutcome, Scorer, Scores, SuiteScore,
    TierResult, percentage, score,
};

/// A report prepared for matching: the original text plus a lowercased copy.
/// All offsets handed out by the scoring modules index into `lowered`.
#[derive(Debug, Clone)]
pub struct NormalizedReport<'a> {
    original: &'a str,
    lowered: String,
}

impl<'a> NormalizedReport<'a> {
    pub fn new(original: &'a str) -> Self {
        Self {
            original,
            lowered: original.to_lowercase(),
        }
    }

    pub fn original(&self) -> &'a str {
        self.original
    }

    pub fn lowered(&self) -> &str {
        &self.lowered
    }
}

/// Context window sizes, in characters, used for severity attribution.
///
/// These are empirical heuristics. The asymmetry of the false-positive window
/// (more text before a mention than after) is deliberate: severity headings
/// precede the code they cite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextWindows {
    /// Characters before a keyword searched when inferring reported severity.
    pub inference: usize,
    pub false_positive_before: usize,
    pub false_positive_after: usize,
}

impl Default for ContextWindows {
    fn default() -> Self {
        Self {
            inference: inference::DEFAULT_WINDOW,
            false_positive_before: false_positive::DEFAULT_WINDOW_BEFORE,
            false_positive_after: false_positive::DEFAULT_WINDOW_AFTER,
        }
    }
}
