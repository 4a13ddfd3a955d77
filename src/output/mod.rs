use crate::error::Result;
use crate::runner::{RunResult, SuiteResult};
use crate::scoring::SuiteScore;
use askama::Template;
use colored::Colorize;
use std::fmt::Write;

/// `N/A` for an undefined score, otherwise one decimal place.
pub fn format_pct(value: Option<f64>) -> String {
    value.map_or_else(|| "N/A".to_string(), |pct| format!("{pct:.1}%"))
}

/// Human-readable run report. Failing runs list the exact missed findings and
/// escalated false positives behind the verdict.
///
/// Colour follows `colored`'s global control: off when stdout is not a
/// terminal or `NO_COLOR` is set, and forced off by the CLI in CI mode.
pub fn render_console(run: &RunResult) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} ({} depth, {})\n",
        "Audit regression run".bold(),
        run.depth,
        run.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
    );

    for suite in &run.contracts {
        render_suite(&mut out, suite);
    }

    let s = &run.summary;
    let _ = writeln!(out, "{}", "Summary".bold());
    let _ = writeln!(
        out,
        "  must-detect      {}/{} ({})",
        s.must_found,
        s.must_total,
        format_pct(s.must_detect)
    );
    let _ = writeln!(
        out,
        "  overall          {}/{} ({})",
        s.all_found,
        s.all_total,
        format_pct(s.overall)
    );
    let _ = writeln!(
        out,
        "  false positives  {}/{} ({:.1}%)",
        s.fp_triggered, s.fp_total, s.false_positives
    );
    let _ = writeln!(
        out,
        "  suites           {} scored, {} failed in {:.1}s\n",
        s.scored, s.failed, s.total_time
    );

    if run.passed() {
        let _ = writeln!(out, "{}", "PASSED".green().bold());
    } else {
        let _ = writeln!(out, "{}", "FAILED".red().bold());
        for reason in failure_reasons(run) {
            let _ = writeln!(out, "  - {reason}");
        }
    }
    out
}

fn render_suite(out: &mut String, suite: &SuiteResult) {
    let timing = format!("[{} ms]", suite.elapsed_ms).dimmed();
    if !suite.is_scored() {
        let _ = writeln!(
            out,
            "{} {timing}\n  {} {}\n",
            suite.name.bold(),
            "generation failed:".red(),
            suite.error.as_deref().unwrap_or("unknown error")
        );
        return;
    }

    let score = &suite.score;
    let _ = writeln!(out, "{} {timing}", suite.name.bold());
    let _ = writeln!(
        out,
        "  must-detect      {}/{} ({})",
        score.must_detect.found,
        score.must_detect.total,
        format_pct(score.scores.critical)
    );
    let _ = writeln!(
        out,
        "  should-detect    {}/{}",
        score.should_detect.found, score.should_detect.total
    );
    let _ = writeln!(
        out,
        "  nice-to-detect   {}/{}",
        score.nice_to_detect.found, score.nice_to_detect.total
    );
    let _ = writeln!(
        out,
        "  false positives  {}/{} triggered",
        score.false_positives.triggered, score.false_positives.total
    );

    for item in score.must_detect.missed() {
        let _ = writeln!(
            out,
            "    {} {}: {}",
            "missed".red(),
            item.id,
            item.description
        );
    }
    for item in severity_mismatches(score) {
        let _ = writeln!(out, "    {} {item}", "severity".yellow());
    }
    for fp in score.false_positives.triggered_items() {
        let _ = writeln!(
            out,
            "    {} {} (rated {}, ceiling {})",
            "false positive".red(),
            fp.description,
            fp.escalated_to.map_or_else(|| "?".to_string(), |s| s.to_string()),
            fp.max_acceptable_severity
        );
    }
    out.push('\n');
}

/// Detected findings whose inferred severity differs from the expected one.
/// Informational only; never part of the verdict.
fn severity_mismatches(score: &SuiteScore) -> Vec<String> {
    score
        .must_detect
        .items
        .iter()
        .chain(&score.should_detect.items)
        .chain(&score.nice_to_detect.items)
        .filter_map(|item| {
            let reported = item.inferred_severity?;
            (item.detected && reported != item.expected_severity).then(|| {
                format!(
                    "{}: expected {}, reported {reported}",
                    item.id, item.expected_severity
                )
            })
        })
        .collect()
}

/// Specific reasons a run failed, by suite and finding.
pub fn failure_reasons(run: &RunResult) -> Vec<String> {
    let mut reasons = Vec::new();
    if run.summary.scored == 0 {
        reasons.push("no suite produced a scorable report".to_string());
    }
    for suite in run.contracts.iter().filter(|s| s.is_scored()) {
        for item in suite.score.must_detect.missed() {
            reasons.push(format!(
                "{}: missed must-detect {} ({})",
                suite.name, item.id, item.description
            ));
        }
        for fp in suite.score.false_positives.triggered_items() {
            reasons.push(format!(
                "{}: false positive escalated: {}",
                suite.name, fp.description
            ));
        }
    }
    reasons
}

/// One line per persisted run, oldest first.
pub fn render_history(runs: &[RunResult]) -> String {
    if runs.is_empty() {
        return "No recorded runs.\n".to_string();
    }
    let mut out = String::new();
    for run in runs {
        let s = &run.summary;
        let _ = writeln!(
            out,
            "{}  {:<5}  must {:>6}  overall {:>6}  fp {:>5.1}%  {} scored/{} failed  {}",
            run.timestamp.format("%Y-%m-%d %H:%M:%S"),
            run.depth,
            format_pct(s.must_detect),
            format_pct(s.overall),
            s.false_positives,
            s.scored,
            s.failed,
            if s.passed { "PASS" } else { "FAIL" }
        );
    }
    out
}

#[derive(Template)]
#[template(path = "scorecard.html")]
struct Scorecard {
    generated_at: String,
    depth: String,
    passed: bool,
    must_detect: String,
    overall: String,
    false_positives: String,
    total_time: String,
    suites: Vec<SuiteView>,
    reasons: Vec<String>,
}

#[allow(dead_code)] // fields used by Askama template
struct SuiteView {
    name: String,
    failed: bool,
    error: String,
    must: String,
    should: String,
    nice: String,
    false_positives: String,
    critical: String,
    elapsed_ms: u64,
}

impl From<&SuiteResult> for SuiteView {
    fn from(suite: &SuiteResult) -> Self {
        let score = &suite.score;
        Self {
            name: suite.name.clone(),
            failed: !suite.is_scored(),
            error: suite.error.clone().unwrap_or_default(),
            must: format!("{}/{}", score.must_detect.found, score.must_detect.total),
            should: format!("{}/{}", score.should_detect.found, score.should_detect.total),
            nice: format!("{}/{}", score.nice_to_detect.found, score.nice_to_detect.total),
            false_positives: format!(
                "{}/{}",
                score.false_positives.triggered, score.false_positives.total
            ),
            critical: format_pct(score.scores.critical),
            elapsed_ms: suite.elapsed_ms,
        }
    }
}

/// Standalone HTML scorecard for a run.
pub fn render_scorecard(run: &RunResult) -> Result<String> {
    let s = &run.summary;
    let card = Scorecard {
        generated_at: run.timestamp.format("%Y-%m-%d %H:%M UTC").to_string(),
        depth: run.depth.to_string(),
        passed: s.passed,
        must_detect: format_pct(s.must_detect),
        overall: format_pct(s.overall),
        false_positives: format!("{:.1}%", s.false_positives),
        total_time: format!("{:.1}s", s.total_time),
        suites: run.contracts.iter().map(SuiteView::from).collect(),
        reasons: failure_reasons(run),
    };
    Ok(card.render()?)
}
