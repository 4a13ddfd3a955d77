use super::NormalizedReport;
use super::inference::context_window;
use crate::fixture::{ExpectedFinding, Keyword, KeywordKind};
use fancy_regex::Regex;
use std::ops::Range;
use tracing::debug;

/// True if any of the finding's keywords occurs in `report`.
///
/// Any single keyword proves detection. Broad keyword sets can therefore
/// overstate detection quality; that is a property of the fixture, not
/// something the matcher second-guesses.
pub fn detected(report: &str, finding: &ExpectedFinding) -> bool {
    first_match(&NormalizedReport::new(report), &finding.keywords).is_some()
}

/// The first keyword, in listed order, that occurs in `report`.
pub fn first_match<'k>(report: &NormalizedReport<'_>, keywords: &'k [Keyword]) -> Option<&'k Keyword> {
    keywords.iter().find(|kw| matches(report, kw))
}

/// A keyword occurrence: the text it was found in and its byte span there.
///
/// Regex keywords are found in the original text and literals in the lowered
/// copy, so the span is only meaningful against `text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hit<'r> {
    pub text: &'r str,
    pub span: Range<usize>,
}

impl<'r> Hit<'r> {
    /// Up to `chars` characters ending where the match starts.
    pub fn before(&self, chars: usize) -> &'r str {
        context_window(self.text, self.span.start, chars, 0)
    }

    /// Up to `chars` characters starting where the match ends.
    pub fn after(&self, chars: usize) -> &'r str {
        context_window(self.text, self.span.end, 0, chars)
    }
}

/// Whether the keyword occurs at all. Defined through [`locate`] so detection
/// and severity attribution never disagree about a keyword.
pub fn matches(report: &NormalizedReport<'_>, keyword: &Keyword) -> bool {
    locate(report, keyword).is_some()
}

/// First occurrence of the keyword. Regex keywords run case-insensitively
/// against the original text; one that fails to compile or evaluate degrades
/// to a literal substring search of the lowered text.
pub fn locate<'r>(report: &'r NormalizedReport<'_>, keyword: &Keyword) -> Option<Hit<'r>> {
    if keyword.kind == KeywordKind::Regex
        && let Some(re) = compile(&keyword.pattern)
    {
        match re.find(report.original()) {
            Ok(found) => {
                return found.map(|m| Hit {
                    text: report.original(),
                    span: m.range(),
                });
            }
            Err(e) => {
                debug!(pattern = %keyword.pattern, error = %e, "regex evaluation failed, using literal search");
            }
        }
    }
    let needle = keyword.pattern.to_lowercase();
    report.lowered().find(&needle).map(|start| Hit {
        text: report.lowered(),
        span: start..start + needle.len(),
    })
}

fn compile(pattern: &str) -> Option<Regex> {
    match Regex::new(&format!("(?i){pattern}")) {
        Ok(re) => Some(re),
        Err(e) => {
            debug!(pattern, error = %e, "invalid keyword regex, using literal match");
            None
        }
    }
}
