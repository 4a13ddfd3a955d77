//! Fixture store: test suites pairing a contract with the findings a correct
//! audit report must (and must not) contain.
//!
//! A fixture document is a JSON array of suites. `contractFile` paths resolve
//! against the directory of the document that declares them, and sources are
//! read eagerly so a broken fixture fails before any report is generated.

use crate::error::{Error, Result};
use crate::severity::Severity;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// How a keyword is tested against a report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeywordKind {
    #[default]
    Literal,
    Regex,
}

/// One detection signal. A bare JSON string is always a literal, so
/// signatures like `withdraw(uint256)` need no escaping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "KeywordRepr")]
pub struct Keyword {
    pub pattern: String,
    pub kind: KeywordKind,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum KeywordRepr {
    Bare(String),
    Tagged {
        pattern: String,
        #[serde(default)]
        kind: KeywordKind,
    },
}

impl From<KeywordRepr> for Keyword {
    fn from(repr: KeywordRepr) -> Self {
        match repr {
            KeywordRepr::Bare(pattern) => Self::literal(pattern),
            KeywordRepr::Tagged { pattern, kind } => Self { pattern, kind },
        }
    }
}

impl Keyword {
    pub fn literal(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            kind: KeywordKind::Literal,
        }
    }

    pub fn regex(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            kind: KeywordKind::Regex,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpectedFinding {
    pub id: String,
    pub description: String,
    pub severity: Severity,
    pub keywords: Vec<Keyword>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FalsePositiveSpec {
    pub description: String,
    pub keywords: Vec<Keyword>,
    pub max_acceptable_severity: Severity,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpectedFindings {
    #[serde(default)]
    pub must_detect: Vec<ExpectedFinding>,
    #[serde(default)]
    pub should_detect: Vec<ExpectedFinding>,
    #[serde(default)]
    pub nice_to_detect: Vec<ExpectedFinding>,
    #[serde(default)]
    pub false_positives: Vec<FalsePositiveSpec>,
}

impl ExpectedFindings {
    fn all_findings(&self) -> impl Iterator<Item = &ExpectedFinding> {
        self.must_detect
            .iter()
            .chain(&self.should_detect)
            .chain(&self.nice_to_detect)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestSuite {
    pub name: String,
    pub contract_file: PathBuf,
    /// Audit context forwarded verbatim to the report generator.
    #[serde(default)]
    pub context: serde_json::Value,
    #[serde(default)]
    pub expected_findings: ExpectedFindings,
}

/// A suite together with its contract source, ready to run.
#[derive(Debug, Clone)]
pub struct LoadedSuite {
    pub suite: TestSuite,
    pub contract_path: PathBuf,
    pub source: String,
}

impl LoadedSuite {
    pub fn name(&self) -> &str {
        &self.suite.name
    }

    /// Contract name as shown to the generator: the file stem.
    pub fn contract_name(&self) -> String {
        self.contract_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.suite.name.clone())
    }
}

/// Parse a fixture document without touching the filesystem.
pub fn parse_suites(json: &str) -> Result<Vec<TestSuite>> {
    serde_json::from_str(json).map_err(|e| Error::fixture(format!("invalid fixture JSON: {e}")))
}

/// Load every suite from a fixture file, or from all `*.json` files under a
/// fixture directory (sorted by path).
pub fn load(path: &Path) -> Result<Vec<LoadedSuite>> {
    if !path.exists() {
        return Err(Error::fixture(format!(
            "fixture path does not exist: {}",
            path.display()
        )));
    }

    let files = if path.is_dir() {
        collect_fixture_files(path)
    } else {
        vec![path.to_path_buf()]
    };
    if files.is_empty() {
        return Err(Error::fixture(format!(
            "no fixture files under {}",
            path.display()
        )));
    }

    let mut loaded = Vec::new();
    for file in &files {
        let json = std::fs::read_to_string(file).map_err(|e| {
            Error::fixture(format!("failed to read fixture {}: {e}", file.display()))
        })?;
        let suites: Vec<TestSuite> = serde_json::from_str(&json)
            .map_err(|e| Error::fixture(format!("invalid fixture {}: {e}", file.display())))?;
        let base = file.parent().unwrap_or_else(|| Path::new("."));
        debug!(file = %file.display(), suites = suites.len(), "parsed fixture file");

        for suite in suites {
            let contract_path = base.join(&suite.contract_file);
            let source = std::fs::read_to_string(&contract_path).map_err(|e| {
                Error::fixture(format!(
                    "suite '{}': cannot read contract {}: {e}",
                    suite.name,
                    contract_path.display()
                ))
            })?;
            loaded.push(LoadedSuite {
                suite,
                contract_path,
                source,
            });
        }
    }

    validate(loaded.iter().map(|l| &l.suite))?;
    info!(count = loaded.len(), "loaded test suites");
    Ok(loaded)
}

/// Reject fixtures that could never score meaningfully.
pub fn validate<'a>(suites: impl IntoIterator<Item = &'a TestSuite>) -> Result<()> {
    let mut names = HashSet::new();
    for suite in suites {
        if !names.insert(suite.name.as_str()) {
            return Err(Error::fixture(format!("duplicate suite name '{}'", suite.name)));
        }

        let mut ids = HashSet::new();
        for finding in suite.expected_findings.all_findings() {
            if !ids.insert(finding.id.as_str()) {
                return Err(Error::fixture(format!(
                    "suite '{}': duplicate finding id '{}'",
                    suite.name, finding.id
                )));
            }
            if !usable_keywords(&finding.keywords) {
                return Err(Error::fixture(format!(
                    "suite '{}': finding '{}' has no keywords or a blank one",
                    suite.name, finding.id
                )));
            }
        }

        for fp in &suite.expected_findings.false_positives {
            if !usable_keywords(&fp.keywords) {
                return Err(Error::fixture(format!(
                    "suite '{}': false positive '{}' has no keywords or a blank one",
                    suite.name, fp.description
                )));
            }
        }
    }
    Ok(())
}

// A blank pattern would match every report.
fn usable_keywords(keywords: &[Keyword]) -> bool {
    !keywords.is_empty() && keywords.iter().all(|kw| !kw.pattern.trim().is_empty())
}

/// Keep suites whose name contains `filter`, case-insensitively.
pub fn filter_by_name(suites: Vec<LoadedSuite>, filter: Option<&str>) -> Result<Vec<LoadedSuite>> {
    let Some(filter) = filter else {
        return Ok(suites);
    };
    let needle = filter.to_lowercase();
    let kept: Vec<LoadedSuite> = suites
        .into_iter()
        .filter(|s| s.name().to_lowercase().contains(&needle))
        .collect();
    if kept.is_empty() {
        return Err(Error::fixture(format!("no suites match filter '{filter}'")));
    }
    Ok(kept)
}

fn collect_fixture_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();
    files
}
