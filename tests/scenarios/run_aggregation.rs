use st_auditbench::error::{Error, Result};
use st_auditbench::fixture::{self, ExpectedFindings};
use st_auditbench::generator::{CannedReportGenerator, Depth, GenerationRequest, ReportGenerator};
use st_auditbench::history;
use st_auditbench::runner::{EXIT_FAILED, EXIT_OK, Harness, SuiteStatus};
use st_auditbench::severity::Severity;
use std::collections::HashMap;
use std::sync::Mutex;

use super::helpers::{finding, fixtures_dir, loaded, padded, suite};

/// Serves fixed reports by suite name; a missing entry is a generator error.
struct ScriptedGenerator {
    reports: HashMap<String, String>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    fn new(reports: &[(&str, String)]) -> Self {
        Self {
            reports: reports
                .iter()
                .map(|(name, text)| (name.to_string(), text.clone()))
                .collect(),
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl ReportGenerator for ScriptedGenerator {
    async fn generate(&self, request: &GenerationRequest<'_>) -> Result<String> {
        self.calls.lock().unwrap().push(request.suite_name.to_string());
        self.reports
            .get(request.suite_name)
            .cloned()
            .ok_or_else(|| Error::generation("upstream returned 502"))
    }
}

struct Unreachable;

impl ReportGenerator for Unreachable {
    async fn preflight(&self) -> Result<()> {
        Err(Error::config("generator endpoint unreachable"))
    }

    async fn generate(&self, _request: &GenerationRequest<'_>) -> Result<String> {
        unreachable!("generate must not run after a failed preflight")
    }
}

fn vault_suite(name: &str) -> st_auditbench::fixture::LoadedSuite {
    loaded(suite(
        name,
        ExpectedFindings {
            must_detect: vec![finding("M-1", Severity::High, &["reentrancy"])],
            should_detect: vec![finding("S-1", Severity::Low, &["floating pragma"])],
            ..Default::default()
        },
    ))
}

#[tokio::test]
async fn failing_generator_does_not_abort_the_run() {
    let report = padded("## 🟠 HIGH-1: Reentrancy in withdraw");
    let generator = ScriptedGenerator::new(&[("A", report.clone()), ("C", report)]);
    let suites = vec![vault_suite("A"), vault_suite("B"), vault_suite("C")];

    let run = Harness::new(&generator, Depth::Quick)
        .run(&suites)
        .await
        .unwrap();

    assert_eq!(*generator.calls.lock().unwrap(), vec!["A", "B", "C"]);
    assert_eq!(run.contracts.len(), 3);
    let b = &run.contracts[1];
    assert_eq!(b.status, SuiteStatus::Failed);
    assert!(b.error.as_deref().unwrap().contains("502"));
    assert_eq!(b.score.must_detect.total, 0);

    assert_eq!(run.contracts[0].status, SuiteStatus::Scored);
    assert_eq!(run.contracts[2].status, SuiteStatus::Scored);
    assert_eq!(run.summary.scored, 2);
    assert_eq!(run.summary.failed, 1);
    assert_eq!(run.summary.must_found, 2);
    assert_eq!(run.summary.must_total, 2);
    assert_eq!(run.summary.all_total, 4);
}

#[tokio::test]
async fn short_report_marks_suite_failed() {
    let generator = ScriptedGenerator::new(&[("A", "ok".to_string())]);
    let run = Harness::new(&generator, Depth::Deep)
        .run(&[vault_suite("A")])
        .await
        .unwrap();

    assert_eq!(run.contracts[0].status, SuiteStatus::Failed);
    assert!(run.contracts[0].error.as_deref().unwrap().contains("too short"));
    assert!(!run.passed());
}

#[tokio::test]
async fn min_report_length_is_configurable() {
    let generator = ScriptedGenerator::new(&[("A", "reentrancy".to_string())]);
    let run = Harness::new(&generator, Depth::Quick)
        .with_min_report_chars(5)
        .run(&[vault_suite("A")])
        .await
        .unwrap();
    assert_eq!(run.contracts[0].status, SuiteStatus::Scored);
}

#[tokio::test]
async fn should_detect_misses_still_pass() {
    let generator = ScriptedGenerator::new(&[(
        "A",
        padded("## 🟠 HIGH-1: Reentrancy in withdraw"),
    )]);
    let run = Harness::new(&generator, Depth::Quick)
        .run(&[vault_suite("A")])
        .await
        .unwrap();

    assert_eq!(run.contracts[0].score.should_detect.found, 0);
    assert!(run.passed());
    assert_eq!(run.exit_code(true), EXIT_OK);
}

#[tokio::test]
async fn preflight_failure_is_a_configuration_error() {
    let err = Harness::new(&Unreachable, Depth::Quick)
        .run(&[vault_suite("A")])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[tokio::test]
async fn canned_fixture_run_matches_expected_scores() {
    let suites = fixture::load(&fixtures_dir().join("suites.json")).unwrap();
    let generator = CannedReportGenerator::new(fixtures_dir().join("reports"));
    let run = Harness::new(&generator, Depth::Quick)
        .run(&suites)
        .await
        .unwrap();

    assert_eq!(run.summary.scored, 3);
    assert_eq!((run.summary.must_found, run.summary.must_total), (2, 3));
    assert_eq!((run.summary.all_found, run.summary.all_total), (4, 6));
    assert_eq!(run.summary.fp_triggered, 1);
    assert!(!run.passed());
    assert_eq!(run.exit_code(true), EXIT_FAILED);

    let vault = &run.contracts[0];
    assert_eq!(
        vault.score.must_detect.items[0].inferred_severity,
        Some(Severity::High)
    );
    let bank = &run.contracts[2];
    assert_eq!(bank.score.scores.critical, None);
    assert_eq!(
        bank.score.false_positives.items[0].escalated_to,
        Some(Severity::Critical)
    );
}

#[tokio::test]
async fn persisted_run_round_trips() {
    let generator = ScriptedGenerator::new(&[(
        "A",
        padded("## 🟠 HIGH-1: Reentrancy in withdraw"),
    )]);
    let run = Harness::new(&generator, Depth::Quick)
        .run(&[vault_suite("A")])
        .await
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = history::save(&run, dir.path()).unwrap();
    assert!(path.file_name().unwrap().to_string_lossy().ends_with("-quick.json"));

    let loaded = history::load(dir.path()).unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].timestamp, run.timestamp);
    assert_eq!(loaded[0].contracts, run.contracts);
    assert_eq!(loaded[0].summary.passed, run.summary.passed);
}
