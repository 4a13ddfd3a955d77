//! Turns raw model output into a markdown report.
//!
//! Models are asked for JSON, but answers arrive fenced, prefixed with prose,
//! or cut off at the token limit. Extraction is best-effort: when no report can
//! be recovered the raw text is used as-is, since it is usually markdown.

use crate::severity::Severity;
use serde::Deserialize;
use std::fmt::Write;
use tracing::debug;

#[derive(Debug, Deserialize)]
pub struct AuditReport {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub findings: Vec<ReportFinding>,
}

#[derive(Debug, Deserialize)]
pub struct ReportFinding {
    pub title: String,
    pub severity: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub recommendation: Option<String>,
}

/// Render a model response as markdown.
pub fn render_response(contract_name: &str, text: &str) -> String {
    match parse_report(text) {
        Some(report) => to_markdown(contract_name, &report),
        None => {
            debug!("model output is not a JSON report, using raw text");
            text.to_string()
        }
    }
}

pub fn parse_report(text: &str) -> Option<AuditReport> {
    let json = extract_json(text);
    serde_json::from_str(json)
        .ok()
        .or_else(|| recover_truncated(json))
}

/// Findings grouped by severity (highest first), headed `## 🟠 HIGH-1: Title`.
pub fn to_markdown(contract_name: &str, report: &AuditReport) -> String {
    let mut ranked: Vec<(Severity, &ReportFinding)> = report
        .findings
        .iter()
        .map(|f| (f.severity.parse().unwrap_or(Severity::Info), f))
        .collect();
    ranked.sort_by(|a, b| b.0.cmp(&a.0));

    let mut out = format!("# Security Audit: {contract_name}\n\n");
    if !report.summary.is_empty() {
        let _ = writeln!(out, "## Summary\n\n{}\n", report.summary.trim());
    }
    if ranked.is_empty() {
        out.push_str("No findings reported.\n");
        return out;
    }

    let mut counter = 0;
    let mut current: Option<Severity> = None;
    for (severity, finding) in ranked {
        if current != Some(severity) {
            current = Some(severity);
            counter = 0;
        }
        counter += 1;
        let _ = writeln!(
            out,
            "## {} {severity}-{counter}: {}\n",
            severity.emoji(),
            finding.title.trim()
        );
        if let Some(location) = finding.location.as_deref().filter(|l| !l.is_empty()) {
            let _ = writeln!(out, "**Location:** {location}\n");
        }
        if !finding.description.is_empty() {
            let _ = writeln!(out, "{}\n", finding.description.trim());
        }
        if let Some(fix) = finding.recommendation.as_deref().filter(|r| !r.is_empty()) {
            let _ = writeln!(out, "**Recommendation:** {fix}\n");
        }
    }
    out
}

/// Extract JSON from a response that might be wrapped in markdown code fences.
pub fn extract_json(text: &str) -> &str {
    if let Some(start) = text.find("```json") {
        let content = &text[start + 7..];
        return match content.find("```") {
            Some(end) => content[..end].trim(),
            // Unterminated fence: the response was cut off mid-JSON.
            None => content.trim(),
        };
    }
    if let Some(start) = text.find("```") {
        let content = &text[start + 3..];
        if let Some(end) = content.find("```") {
            let inner = content[..end].trim();
            if inner.starts_with('{') || inner.starts_with('[') {
                return inner;
            }
        }
    }
    if let Some(start) = text.find('{')
        && let Some(end) = text.rfind('}')
        && end > start
    {
        return &text[start..=end];
    }
    text
}

/// Salvage a report whose JSON was truncated inside the `findings` array by
/// cutting back to the last complete finding object and closing the document.
pub fn recover_truncated(json: &str) -> Option<AuditReport> {
    let array_start = json.find("\"findings\"")?;
    let open = array_start + json[array_start..].find('[')?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    let mut last_complete = None;

    for (i, c) in json[open + 1..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    last_complete = Some(open + 1 + i);
                }
            }
            ']' if depth == 0 => break,
            _ => {}
        }
    }

    let end = last_complete?;
    let repaired = format!("{}]}}", &json[..=end]);
    let report: AuditReport = serde_json::from_str(&repaired).ok()?;
    debug!(
        recovered = report.findings.len(),
        "recovered findings from truncated JSON"
    );
    Some(report)
}
