use super::{Depth, GenerationRequest, ReportGenerator};
use crate::error::{Error, Result};
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::debug;

/// Serves pre-generated reports from a directory, for offline regression runs.
///
/// For suite "Token Vault" at deep depth it reads `token-vault-deep.md`,
/// falling back to `token-vault.md`.
pub struct CannedReportGenerator {
    dir: PathBuf,
}

impl CannedReportGenerator {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn candidates(&self, suite_name: &str, depth: Depth) -> [PathBuf; 2] {
        let slug = slug(suite_name);
        [
            self.dir.join(format!("{slug}-{depth}.md")),
            self.dir.join(format!("{slug}.md")),
        ]
    }
}

impl ReportGenerator for CannedReportGenerator {
    async fn preflight(&self) -> Result<()> {
        if self.dir.is_dir() {
            Ok(())
        } else {
            Err(Error::config(format!(
                "reports directory not found: {}",
                self.dir.display()
            )))
        }
    }

    async fn generate(&self, request: &GenerationRequest<'_>) -> Result<String> {
        for path in self.candidates(request.suite_name, request.depth) {
            match tokio::fs::read_to_string(&path).await {
                Ok(text) => {
                    debug!(path = %path.display(), "serving canned report");
                    return Ok(text);
                }
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => {
                    return Err(Error::generation(format!(
                        "read {}: {e}",
                        path.display()
                    )));
                }
            }
        }
        Err(Error::generation(format!(
            "no canned report for suite '{}' in {}",
            request.suite_name,
            self.dir.display()
        )))
    }
}

/// Lowercase, with every run of non-alphanumerics collapsed to one `-`.
pub fn slug(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_alphanumeric() {
            out.extend(c.to_lowercase());
        } else if !out.is_empty() && !out.ends_with('-') {
            out.push('-');
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}
