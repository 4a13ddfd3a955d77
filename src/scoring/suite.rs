use super::false_positive::find_escalation;
use super::inference::infer;
use super::matcher::first_match;
use super::{ContextWindows, NormalizedReport};
use crate::fixture::{ExpectedFinding, FalsePositiveSpec, TestSuite};
use crate::severity::Severity;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindingOutcome {
    pub id: String,
    pub description: String,
    pub expected_severity: Severity,
    pub detected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_keyword: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inferred_severity: Option<Severity>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TierResult {
    pub found: usize,
    pub total: usize,
    pub items: Vec<FindingOutcome>,
}

impl TierResult {
    pub fn missed(&self) -> impl Iterator<Item = &FindingOutcome> {
        self.items.iter().filter(|item| !item.detected)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FalsePositiveOutcome {
    pub description: String,
    pub max_acceptable_severity: Severity,
    pub triggered: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub escalated_to: Option<Severity>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FalsePositiveResult {
    pub triggered: usize,
    pub total: usize,
    pub items: Vec<FalsePositiveOutcome>,
}

impl FalsePositiveResult {
    pub fn triggered_items(&self) -> impl Iterator<Item = &FalsePositiveOutcome> {
        self.items.iter().filter(|item| item.triggered)
    }
}

/// Percentages; `None` where the denominator is zero ("not applicable").
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scores {
    pub critical: Option<f64>,
    pub overall: Option<f64>,
    pub false_positive_rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuiteScore {
    pub must_detect: TierResult,
    pub should_detect: TierResult,
    pub nice_to_detect: TierResult,
    pub false_positives: FalsePositiveResult,
    pub scores: Scores,
}

impl SuiteScore {
    fn tiers(&self) -> [&TierResult; 3] {
        [&self.must_detect, &self.should_detect, &self.nice_to_detect]
    }

    /// Found and total across all three detection tiers.
    pub fn combined(&self) -> (usize, usize) {
        self.tiers()
            .iter()
            .fold((0, 0), |(found, total), tier| (found + tier.found, total + tier.total))
    }
}

/// `found / total * 100`, or `None` for an empty tier.
pub fn percentage(found: usize, total: usize) -> Option<f64> {
    (total > 0).then(|| found as f64 / total as f64 * 100.0)
}

/// Score with the default context windows.
pub fn score(suite: &TestSuite, report: &str) -> SuiteScore {
    Scorer::default().score(suite, report)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Scorer {
    windows: ContextWindows,
}

impl Scorer {
    pub fn new(windows: ContextWindows) -> Self {
        Self { windows }
    }

    pub fn score(&self, suite: &TestSuite, report: &str) -> SuiteScore {
        let report = NormalizedReport::new(report);
        let expected = &suite.expected_findings;

        let must_detect = self.score_tier(&report, &expected.must_detect);
        let should_detect = self.score_tier(&report, &expected.should_detect);
        let nice_to_detect = self.score_tier(&report, &expected.nice_to_detect);
        let false_positives = self.check_false_positives(&report, &expected.false_positives);

        let mut result = SuiteScore {
            must_detect,
            should_detect,
            nice_to_detect,
            false_positives,
            scores: Scores::default(),
        };
        let (found, total) = result.combined();
        result.scores = Scores {
            critical: percentage(result.must_detect.found, result.must_detect.total),
            overall: percentage(found, total),
            false_positive_rate: percentage(
                result.false_positives.triggered,
                result.false_positives.total,
            )
            .unwrap_or(0.0),
        };
        result
    }

    fn score_tier(&self, report: &NormalizedReport<'_>, findings: &[ExpectedFinding]) -> TierResult {
        let items: Vec<FindingOutcome> = findings
            .iter()
            .map(|finding| {
                let matched = first_match(report, &finding.keywords);
                let inferred_severity = matched
                    .and_then(|_| infer(report, &finding.keywords, self.windows.inference));
                FindingOutcome {
                    id: finding.id.clone(),
                    description: finding.description.clone(),
                    expected_severity: finding.severity,
                    detected: matched.is_some(),
                    matched_keyword: matched.map(|kw| kw.pattern.clone()),
                    inferred_severity,
                }
            })
            .collect();

        TierResult {
            found: items.iter().filter(|item| item.detected).count(),
            total: items.len(),
            items,
        }
    }

    fn check_false_positives(
        &self,
        report: &NormalizedReport<'_>,
        specs: &[FalsePositiveSpec],
    ) -> FalsePositiveResult {
        let items: Vec<FalsePositiveOutcome> = specs
            .iter()
            .map(|spec| {
                let escalation = find_escalation(
                    report,
                    spec,
                    self.windows.false_positive_before,
                    self.windows.false_positive_after,
                );
                FalsePositiveOutcome {
                    description: spec.description.clone(),
                    max_acceptable_severity: spec.max_acceptable_severity,
                    triggered: escalation.is_some(),
                    keyword: escalation.as_ref().map(|e| e.keyword.pattern.clone()),
                    escalated_to: escalation.map(|e| e.severity),
                }
            })
            .collect();

        FalsePositiveResult {
            triggered: items.iter().filter(|item| item.triggered).count(),
            total: items.len(),
            items,
        }
    }
}
