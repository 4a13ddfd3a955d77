//! Report generator boundary. The harness only ever sees the final report
//! text; where it came from (hosted model, local model, canned file) and how
//! model output was coerced into markdown stays behind this trait.

pub mod canned;
pub mod llm;
pub mod render;

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::future::Future;

pub use canned::CannedReportGenerator;
pub use llm::{LlmReportGenerator, ProviderHealth};

/// Analysis depth requested from the generator.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Depth {
    #[default]
    Quick,
    Deep,
}

impl std::fmt::Display for Depth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Quick => write!(f, "quick"),
            Self::Deep => write!(f, "deep"),
        }
    }
}

/// Everything a generator receives for one suite.
#[derive(Debug, Clone, Copy)]
pub struct GenerationRequest<'a> {
    pub suite_name: &'a str,
    pub contract_name: &'a str,
    pub contract_source: &'a str,
    pub context: &'a serde_json::Value,
    pub depth: Depth,
}

pub trait ReportGenerator {
    /// Checked once before any suite runs; an error here is a configuration
    /// error, not a suite failure.
    fn preflight(&self) -> impl Future<Output = Result<()>> + Send {
        async { Ok(()) }
    }

    fn generate(&self, request: &GenerationRequest<'_>) -> impl Future<Output = Result<String>> + Send;
}
