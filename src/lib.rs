pub mod config;
pub mod error;
pub mod fixture;
pub mod generator;
pub mod history;
pub mod http;
pub mod llm;
pub mod output;
pub mod runner;
pub mod scoring;
pub mod severity;

/// CLI override for LLM provider/model.
pub struct LlmOverride {
    pub provider: llm::Provider,
    pub model: String,
}
