#![allow(deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn bench_cmd() -> Command {
    let mut cmd = Command::cargo_bin("st-auditbench").expect("binary should be built");
    cmd.env_remove("RUST_LOG").env_remove("CLICOLOR_FORCE");
    cmd
}

fn canned_run(results: &Path) -> Command {
    let mut cmd = bench_cmd();
    cmd.arg("run")
        .arg("--config")
        .arg(results.join("absent.toml"))
        .arg("--fixtures")
        .arg(fixtures_dir().join("suites.json"))
        .arg("--reports-dir")
        .arg(fixtures_dir().join("reports"))
        .arg("--results-dir")
        .arg(results);
    cmd
}

#[test]
fn failing_verdict_exits_1_in_ci() {
    let results = TempDir::new().unwrap();
    canned_run(results.path())
        .arg("--ci")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("FAILED"))
        .stdout(predicate::str::contains("missed must-detect OT-2"))
        .stdout(predicate::str::contains(
            "false positive escalated: safeWithdraw is guarded by nonReentrant",
        ));
}

#[test]
fn failing_verdict_exits_0_interactively() {
    let results = TempDir::new().unwrap();
    canned_run(results.path()).assert().code(0);
}

#[test]
fn ci_output_has_no_color() {
    let results = TempDir::new().unwrap();
    let output = canned_run(results.path()).arg("--ci").output().unwrap();
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(!stdout.contains('\u{1b}'));
}

#[test]
fn piped_interactive_output_has_no_color() {
    let results = TempDir::new().unwrap();
    let output = canned_run(results.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("FAILED"));
    assert!(!stdout.contains('\u{1b}'));
}

#[test]
fn no_color_env_is_honoured() {
    let results = TempDir::new().unwrap();
    let output = canned_run(results.path())
        .env("NO_COLOR", "1")
        .output()
        .unwrap();
    assert!(!String::from_utf8(output.stdout).unwrap().contains('\u{1b}'));
}

#[test]
fn filtered_passing_run_exits_0_in_ci() {
    let results = TempDir::new().unwrap();
    canned_run(results.path())
        .args(["--ci", "--filter", "VAULT"])
        .assert()
        .code(0)
        .stdout(predicate::str::contains("PASSED"));
}

#[test]
fn run_persists_artifact() {
    let results = TempDir::new().unwrap();
    canned_run(results.path())
        .args(["--depth", "deep"])
        .assert()
        .code(0);

    let names: Vec<String> = std::fs::read_dir(results.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names.len(), 1);
    assert!(names[0].starts_with("run-") && names[0].ends_with("-deep.json"));

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(results.path().join(&names[0])).unwrap())
            .unwrap();
    assert_eq!(json["depth"], "deep");
    assert_eq!(json["contracts"].as_array().unwrap().len(), 3);
    assert_eq!(json["summary"]["passed"], false);
}

#[test]
fn html_scorecard_is_written() {
    let results = TempDir::new().unwrap();
    let html = results.path().join("card/scorecard.html");
    canned_run(results.path())
        .arg("--html")
        .arg(&html)
        .assert()
        .code(0);
    let page = std::fs::read_to_string(html).unwrap();
    assert!(page.contains("Reentrancy Vault"));
}

#[test]
fn missing_fixture_exits_2() {
    let results = TempDir::new().unwrap();
    bench_cmd()
        .arg("run")
        .arg("--fixtures")
        .arg(results.path().join("missing.json"))
        .arg("--reports-dir")
        .arg(fixtures_dir().join("reports"))
        .arg("--ci")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("fixture path does not exist"));
}

#[test]
fn unmatched_filter_exits_2() {
    let results = TempDir::new().unwrap();
    canned_run(results.path())
        .args(["--ci", "--filter", "no-such-suite"])
        .assert()
        .code(2);
}

#[test]
fn missing_reports_dir_exits_2_before_any_suite() {
    let results = TempDir::new().unwrap();
    bench_cmd()
        .arg("run")
        .arg("--config")
        .arg(results.path().join("absent.toml"))
        .arg("--fixtures")
        .arg(fixtures_dir().join("suites.json"))
        .arg("--reports-dir")
        .arg(results.path().join("nope"))
        .arg("--results-dir")
        .arg(results.path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("reports directory not found"));
    assert_eq!(std::fs::read_dir(results.path()).unwrap().count(), 0);
}

#[test]
fn score_prints_suite_json() {
    let output = bench_cmd()
        .arg("score")
        .arg("--fixtures")
        .arg(fixtures_dir().join("suites.json"))
        .arg("--suite")
        .arg("Owned Token")
        .arg("--report")
        .arg(fixtures_dir().join("reports/owned-token.md"))
        .output()
        .unwrap();
    assert!(output.status.success());

    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(parsed["mustDetect"]["found"], 1);
    assert_eq!(parsed["mustDetect"]["total"], 2);
    assert_eq!(parsed["scores"]["critical"], 50.0);
    assert_eq!(parsed["mustDetect"]["items"][0]["inferredSeverity"], "CRITICAL");
}

#[test]
fn history_lists_previous_runs() {
    let results = TempDir::new().unwrap();
    canned_run(results.path()).assert().code(0);
    canned_run(results.path())
        .args(["--filter", "vault"])
        .assert()
        .code(0);

    bench_cmd()
        .arg("history")
        .arg("--results-dir")
        .arg(results.path())
        .assert()
        .code(0)
        .stdout(predicate::str::contains("FAIL"))
        .stdout(predicate::str::contains("PASS"));
}
