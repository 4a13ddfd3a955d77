//! Run aggregator: drives suites one at a time through generation and
//! scoring, then folds the results into a single verdict.
//!
//! Each suite moves `pending -> generating -> generated -> scored`, or ends in
//! `failed` when the generator errors or returns a report too short to be
//! real. A failed suite is kept in the run with zero totals; it never aborts
//! the suites after it.

use crate::error::Result;
use crate::fixture::LoadedSuite;
use crate::generator::{Depth, GenerationRequest, ReportGenerator};
use crate::scoring::{Scorer, SuiteScore, percentage};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{info, warn};

pub const EXIT_OK: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_CONFIG: i32 = 2;

pub const DEFAULT_MIN_REPORT_CHARS: usize = 100;

/// Terminal state of a suite execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuiteStatus {
    Scored,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuiteResult {
    pub name: String,
    pub depth: Depth,
    pub timestamp: DateTime<Utc>,
    pub status: SuiteStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub elapsed_ms: u64,
    #[serde(flatten)]
    pub score: SuiteScore,
}

impl SuiteResult {
    pub fn is_scored(&self) -> bool {
        self.status == SuiteStatus::Scored
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    /// Must-detect completeness across scored suites; `None` if there were none.
    pub must_detect: Option<f64>,
    pub overall: Option<f64>,
    pub false_positives: f64,
    /// Wall-clock seconds for the whole run.
    pub total_time: f64,
    pub must_found: usize,
    pub must_total: usize,
    pub all_found: usize,
    pub all_total: usize,
    pub fp_triggered: usize,
    pub fp_total: usize,
    pub scored: usize,
    pub failed: usize,
    pub passed: bool,
}

impl RunSummary {
    pub fn from_results(results: &[SuiteResult], total_time: f64) -> Self {
        let mut summary = Self {
            total_time,
            ..Self::default()
        };
        for result in results {
            if !result.is_scored() {
                summary.failed += 1;
                continue;
            }
            summary.scored += 1;
            let score = &result.score;
            let (found, total) = score.combined();
            summary.must_found += score.must_detect.found;
            summary.must_total += score.must_detect.total;
            summary.all_found += found;
            summary.all_total += total;
            summary.fp_triggered += score.false_positives.triggered;
            summary.fp_total += score.false_positives.total;
        }

        summary.must_detect = percentage(summary.must_found, summary.must_total);
        summary.overall = percentage(summary.all_found, summary.all_total);
        summary.false_positives = percentage(summary.fp_triggered, summary.fp_total).unwrap_or(0.0);
        // All-or-nothing gate: every must-detect finding, no escalated false
        // positive. Should/nice-to-detect misses never fail it.
        summary.passed = summary.scored > 0
            && summary.must_found == summary.must_total
            && summary.fp_triggered == 0;
        summary
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    pub timestamp: DateTime<Utc>,
    pub depth: Depth,
    pub summary: RunSummary,
    pub contracts: Vec<SuiteResult>,
}

impl RunResult {
    pub fn passed(&self) -> bool {
        self.summary.passed
    }

    /// In CI a failing verdict is a non-zero exit; interactively it never is.
    pub fn exit_code(&self, ci: bool) -> i32 {
        if ci && !self.passed() {
            EXIT_FAILED
        } else {
            EXIT_OK
        }
    }
}

pub struct Harness<'g, G> {
    generator: &'g G,
    scorer: Scorer,
    depth: Depth,
    min_report_chars: usize,
}

impl<'g, G: ReportGenerator> Harness<'g, G> {
    pub fn new(generator: &'g G, depth: Depth) -> Self {
        Self {
            generator,
            scorer: Scorer::default(),
            depth,
            min_report_chars: DEFAULT_MIN_REPORT_CHARS,
        }
    }

    pub fn with_scorer(mut self, scorer: Scorer) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn with_min_report_chars(mut self, min_report_chars: usize) -> Self {
        self.min_report_chars = min_report_chars;
        self
    }

    /// Run every suite sequentially. Only a failed generator preflight is an
    /// error; per-suite failures are recorded in the result.
    pub async fn run(&self, suites: &[LoadedSuite]) -> Result<RunResult> {
        self.generator.preflight().await?;

        let timestamp = Utc::now();
        let started = Instant::now();
        info!(suites = suites.len(), depth = %self.depth, "starting regression run");

        let mut contracts = Vec::with_capacity(suites.len());
        for suite in suites {
            contracts.push(self.run_suite(suite).await);
        }

        let summary = RunSummary::from_results(&contracts, started.elapsed().as_secs_f64());
        info!(
            scored = summary.scored,
            failed = summary.failed,
            passed = summary.passed,
            "regression run complete"
        );
        Ok(RunResult {
            timestamp,
            depth: self.depth,
            summary,
            contracts,
        })
    }

    async fn run_suite(&self, loaded: &LoadedSuite) -> SuiteResult {
        let timestamp = Utc::now();
        let started = Instant::now();
        let contract_name = loaded.contract_name();
        let request = GenerationRequest {
            suite_name: loaded.name(),
            contract_name: &contract_name,
            contract_source: &loaded.source,
            context: &loaded.suite.context,
            depth: self.depth,
        };
        info!(suite = %loaded.name(), "generating report");

        let outcome = match self.generator.generate(&request).await {
            Ok(report) => {
                let length = report.trim().chars().count();
                if length < self.min_report_chars {
                    Err(format!(
                        "report too short ({length} chars, minimum {})",
                        self.min_report_chars
                    ))
                } else {
                    Ok(self.scorer.score(&loaded.suite, &report))
                }
            }
            Err(e) => Err(e.to_string()),
        };
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        match outcome {
            Ok(score) => {
                info!(
                    suite = %loaded.name(),
                    must = format!("{}/{}", score.must_detect.found, score.must_detect.total),
                    fp = score.false_positives.triggered,
                    elapsed_ms,
                    "suite scored"
                );
                SuiteResult {
                    name: loaded.name().to_string(),
                    depth: self.depth,
                    timestamp,
                    status: SuiteStatus::Scored,
                    error: None,
                    elapsed_ms,
                    score,
                }
            }
            Err(error) => {
                warn!(suite = %loaded.name(), %error, "suite failed");
                SuiteResult {
                    name: loaded.name().to_string(),
                    depth: self.depth,
                    timestamp,
                    status: SuiteStatus::Failed,
                    error: Some(error),
                    elapsed_ms,
                    score: SuiteScore::default(),
                }
            }
        }
    }
}
