use st_auditbench::fixture::{ExpectedFindings, Keyword};
use st_auditbench::scoring::{detected, is_false_positive, score};
use st_auditbench::severity::Severity;

use super::helpers::{false_positive, finding, suite};

const REPORTS: &[&str] = &[
    "",
    "No issues identified.",
    "## 🟠 HIGH-1: Reentrancy\nThe vault can be drained via re-entrancy.",
    "## 🔴 CRITICAL-1: tx.origin authentication\n## 🟡 MEDIUM-1: Oracle staleness",
    "Uses withdraw(uint256) and delegatecall into user-supplied targets.",
];

#[test]
fn matcher_agrees_with_keyword_presence() {
    let keyword_sets: &[&[&str]] = &[
        &["reentrancy"],
        &["TX.ORIGIN", "unused"],
        &["withdraw(uint256)"],
        &["nothing-like-this"],
    ];
    for report in REPORTS {
        let lowered = report.to_lowercase();
        for keywords in keyword_sets {
            let f = finding("F", Severity::High, keywords);
            let expected = keywords.iter().any(|k| lowered.contains(&k.to_lowercase()));
            assert_eq!(
                detected(report, &f),
                expected,
                "report {report:?} keywords {keywords:?}"
            );
        }
    }
}

#[test]
fn regex_keyword_soundness() {
    let mut f = finding("F", Severity::High, &[]);
    f.keywords = vec![Keyword::regex(r"re-?entran(cy|t)")];
    assert!(detected(REPORTS[2], &f));
    assert!(!detected(REPORTS[3], &f));
}

#[test]
fn found_never_exceeds_total() {
    let s = suite(
        "All",
        ExpectedFindings {
            must_detect: vec![
                finding("M-1", Severity::High, &["reentrancy"]),
                finding("M-2", Severity::Critical, &["tx.origin"]),
            ],
            should_detect: vec![finding("S-1", Severity::Medium, &["oracle"])],
            nice_to_detect: vec![finding("N-1", Severity::Info, &["delegatecall"])],
            false_positives: vec![false_positive("fp", &["vault"], Severity::Low)],
        },
    );
    for report in REPORTS {
        let result = score(&s, report);
        for tier in [&result.must_detect, &result.should_detect, &result.nice_to_detect] {
            assert!(tier.found <= tier.total);
            assert_eq!(tier.total, tier.items.len());
        }
        assert!(result.false_positives.triggered <= result.false_positives.total);
    }
}

#[test]
fn scoring_is_idempotent() {
    let s = suite(
        "Vault",
        ExpectedFindings {
            must_detect: vec![finding("M-1", Severity::High, &["reentrancy"])],
            false_positives: vec![false_positive("fp", &["vault"], Severity::Low)],
            ..Default::default()
        },
    );
    for report in REPORTS {
        let first = serde_json::to_string(&score(&s, report)).unwrap();
        let second = serde_json::to_string(&score(&s, report)).unwrap();
        assert_eq!(first, second);
    }
}

#[test]
fn empty_tiers_yield_defined_scores() {
    let result = score(&suite("Empty", ExpectedFindings::default()), REPORTS[2]);
    assert_eq!(result.scores.critical, None);
    assert_eq!(result.scores.overall, None);
    assert!(result.scores.false_positive_rate.is_finite());

    let json = serde_json::to_value(&result.scores).unwrap();
    assert!(json["critical"].is_null());
    assert_eq!(json["falsePositiveRate"], 0.0);
}

#[test]
fn absence_of_marker_is_not_escalation() {
    let spec = false_positive("guarded", &["safeWithdraw"], Severity::Low);
    assert!(!is_false_positive(
        "The safeWithdraw function uses a guard and is fine.",
        &spec
    ));
    assert!(is_false_positive("🔴 CRITICAL safeWithdraw drains funds", &spec));
}

#[test]
fn keyword_spelling_a_marker_is_not_escalation() {
    for keyword in ["highWaterMark", "criticalPath", "isHighRisk"] {
        let spec = false_positive("benign", &[keyword], Severity::Low);
        let report = format!("The {keyword} variable is updated correctly.");
        assert!(!is_false_positive(&report, &spec), "{keyword}");
    }
}
