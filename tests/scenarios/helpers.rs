use st_auditbench::fixture::{
    ExpectedFinding, ExpectedFindings, FalsePositiveSpec, Keyword, LoadedSuite, TestSuite,
};
use st_auditbench::severity::Severity;
use std::path::PathBuf;

pub fn finding(id: &str, severity: Severity, keywords: &[&str]) -> ExpectedFinding {
    ExpectedFinding {
        id: id.into(),
        description: format!("{id} description"),
        severity,
        keywords: keywords.iter().map(|k| Keyword::literal(*k)).collect(),
    }
}

pub fn false_positive(description: &str, keywords: &[&str], ceiling: Severity) -> FalsePositiveSpec {
    FalsePositiveSpec {
        description: description.into(),
        keywords: keywords.iter().map(|k| Keyword::literal(*k)).collect(),
        max_acceptable_severity: ceiling,
    }
}

pub fn suite(name: &str, expected: ExpectedFindings) -> TestSuite {
    TestSuite {
        name: name.into(),
        contract_file: PathBuf::from(format!("{name}.sol")),
        context: serde_json::Value::Null,
        expected_findings: expected,
    }
}

pub fn loaded(suite: TestSuite) -> LoadedSuite {
    LoadedSuite {
        contract_path: suite.contract_file.clone(),
        source: format!("contract {} {{}}", suite.name),
        suite,
    }
}

pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

/// A report long enough to pass the minimum-length check.
pub fn padded(body: &str) -> String {
    format!("{body}\n\n{}", "Additional notes. ".repeat(10))
}
