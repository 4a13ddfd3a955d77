use st_auditbench::fixture::ExpectedFindings;
use st_auditbench::scoring::{inferred_severity, score};
use st_auditbench::severity::Severity;

use super::helpers::{false_positive, finding, suite};

#[test]
fn heading_severity_is_attributed_to_detected_finding() {
    let must = finding("M-1", Severity::High, &["reentrancy", "re-enter"]);
    let s = suite(
        "Vault",
        ExpectedFindings {
            must_detect: vec![must.clone()],
            ..Default::default()
        },
    );
    let report = "## 🟠 HIGH-1: Reentrancy vulnerability in withdraw()\n\nThe caller can re-enter.";

    let result = score(&s, report);
    assert_eq!(result.must_detect.found, 1);
    assert_eq!(result.must_detect.total, 1);
    assert_eq!(result.scores.critical, Some(100.0));
    assert_eq!(inferred_severity(report, &must), Some(Severity::High));
    assert_eq!(
        result.must_detect.items[0].inferred_severity,
        Some(Severity::High)
    );
}

#[test]
fn escalated_benign_pattern_is_triggered() {
    let s = suite(
        "Bank",
        ExpectedFindings {
            false_positives: vec![false_positive(
                "safeWithdraw is guarded",
                &["safeWithdraw"],
                Severity::Low,
            )],
            ..Default::default()
        },
    );
    let result = score(&s, "🔴 CRITICAL: safeWithdraw is vulnerable to reentrancy");

    assert_eq!(result.false_positives.triggered, 1);
    assert_eq!(result.scores.false_positive_rate, 100.0);
    let item = &result.false_positives.items[0];
    assert_eq!(item.escalated_to, Some(Severity::Critical));
    assert_eq!(item.keyword.as_deref(), Some("safeWithdraw"));
}

#[test]
fn should_detect_misses_do_not_touch_critical_score() {
    let s = suite(
        "Token",
        ExpectedFindings {
            must_detect: vec![finding("M-1", Severity::Critical, &["unrestricted mint"])],
            should_detect: vec![
                finding("S-1", Severity::Low, &["floating pragma"]),
                finding("S-2", Severity::Medium, &["missing zero-address check"]),
            ],
            false_positives: vec![false_positive("owner setter", &["setFee"], Severity::Medium)],
            ..Default::default()
        },
    );
    let result = score(&s, "## 🔴 CRITICAL-1: Unrestricted mint\nAlso a floating pragma.");

    assert_eq!(result.scores.critical, Some(100.0));
    assert_eq!(result.should_detect.found, 1);
    let overall = result.scores.overall.unwrap();
    assert!((overall - 200.0 / 3.0).abs() < 1e-9);
    assert_eq!(result.false_positives.triggered, 0);
}

#[test]
fn suite_is_not_mutated_by_scoring() {
    let s = suite(
        "Vault",
        ExpectedFindings {
            must_detect: vec![finding("M-1", Severity::High, &["reentrancy"])],
            ..Default::default()
        },
    );
    let before = s.clone();
    let _ = score(&s, "reentrancy");
    assert_eq!(s, before);
}
