use crate::LlmOverride;
use crate::error::{Error, Result};
use crate::generator::Depth;
use crate::llm::{LlmClient, Provider};
use crate::runner::DEFAULT_MIN_REPORT_CHARS;
use crate::scoring::ContextWindows;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub harness: HarnessConfig,
    #[serde(default)]
    pub scoring: ContextWindows,
    #[serde(default)]
    pub llm: LlmConfig,
}

#[derive(Debug, Deserialize)]
pub struct HarnessConfig {
    #[serde(default = "default_fixtures")]
    pub fixtures: PathBuf,
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,
    /// Reports shorter than this (trimmed, in characters) count as failed generations.
    #[serde(default = "default_min_report_chars")]
    pub min_report_chars: usize,
    #[serde(default)]
    pub depth: Depth,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            fixtures: default_fixtures(),
            results_dir: default_results_dir(),
            min_report_chars: default_min_report_chars(),
            depth: Depth::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub provider: Provider,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    pub api_key_env: Option<String>,
    pub base_url: Option<String>,
    /// Seconds a failed provider is skipped before being tried again.
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Providers tried in order after the primary one fails.
    #[serde(default)]
    pub fallback: Vec<ModelConfig>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            api_key_env: None,
            base_url: None,
            cooldown_secs: default_cooldown_secs(),
            timeout_secs: default_timeout_secs(),
            fallback: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub provider: Provider,
    pub model: String,
    pub base_url: Option<String>,
    pub api_key_env: Option<String>,
    pub max_tokens: Option<u32>,
}

// Defaults
fn default_fixtures() -> PathBuf {
    PathBuf::from("fixtures")
}
fn default_results_dir() -> PathBuf {
    PathBuf::from("results")
}
fn default_min_report_chars() -> usize {
    DEFAULT_MIN_REPORT_CHARS
}
fn default_model() -> String {
    "anthropic/claude-sonnet-4.5".into()
}
fn default_max_tokens() -> u32 {
    8192
}
fn default_cooldown_secs() -> u64 {
    60
}
fn default_timeout_secs() -> u64 {
    180
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("Failed to read config {}: {e}", path.display())))?;
        toml::from_str(&content).map_err(|e| Error::config(format!("Failed to parse config: {e}")))
    }

    /// A missing file means defaults; an unreadable or invalid one is an error.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}

impl LlmConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    /// Primary client (with any CLI override applied) followed by fallbacks.
    pub fn build_chain(&self, llm_override: Option<&LlmOverride>) -> Result<Vec<LlmClient>> {
        let timeout = Duration::from_secs(self.timeout_secs);
        let provider = llm_override
            .map(|o| o.provider.clone())
            .unwrap_or_else(|| self.provider.clone());
        let model = llm_override
            .map(|o| o.model.clone())
            .unwrap_or_else(|| self.model.clone());

        let mut chain = vec![LlmClient::from_config(
            provider,
            model,
            self.max_tokens,
            self.api_key_env.clone(),
            self.base_url.clone(),
            timeout,
        )?];
        for fb in &self.fallback {
            chain.push(LlmClient::from_config(
                fb.provider.clone(),
                fb.model.clone(),
                fb.max_tokens.unwrap_or(self.max_tokens),
                fb.api_key_env.clone(),
                fb.base_url.clone(),
                timeout,
            )?);
        }
        Ok(chain)
    }
}
