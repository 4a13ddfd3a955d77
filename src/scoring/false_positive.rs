use super::NormalizedReport;
use super::matcher::locate;
use crate::fixture::{FalsePositiveSpec, Keyword};
use crate::severity::Severity;

pub const DEFAULT_WINDOW_BEFORE: usize = 800;
pub const DEFAULT_WINDOW_AFTER: usize = 200;

/// Only these levels count as escalation; a nearby MEDIUM is never flagged.
const ESCALATED: [Severity; 2] = [Severity::Critical, Severity::High];

/// Where and how far a report over-escalated a benign pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Escalation<'k> {
    pub keyword: &'k Keyword,
    pub severity: Severity,
}

/// True if the report rates the benign pattern above its severity ceiling.
pub fn is_false_positive(report: &str, spec: &FalsePositiveSpec) -> bool {
    find_escalation(
        &NormalizedReport::new(report),
        spec,
        DEFAULT_WINDOW_BEFORE,
        DEFAULT_WINDOW_AFTER,
    )
    .is_some()
}

/// First keyword whose surrounding text carries a HIGH or CRITICAL marker
/// ranked above `spec.max_acceptable_severity`.
///
/// A mention with no marker nearby is not an escalation.
pub fn find_escalation<'k>(
    report: &NormalizedReport<'_>,
    spec: &'k FalsePositiveSpec,
    before: usize,
    after: usize,
) -> Option<Escalation<'k>> {
    spec.keywords.iter().find_map(|keyword| {
        let hit = locate(report, keyword)?;
        // The keyword's own text is excluded: `highWaterMark` is not a HIGH.
        let framing = format!("{}\n{}", hit.before(before), hit.after(after)).to_lowercase();
        ESCALATED
            .into_iter()
            .find(|level| level.is_marked_in(&framing))
            .filter(|level| *level > spec.max_acceptable_severity)
            .map(|severity| Escalation { keyword, severity })
    })
}
