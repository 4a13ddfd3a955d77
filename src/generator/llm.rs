use super::render::render_response;
use super::{Depth, GenerationRequest, ReportGenerator};
use crate::error::{Error, Result};
use crate::llm::LlmClient;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Last-failure timestamps per provider, owned by the caller and shared with
/// the generator so fallback decisions are inspectable and resettable.
#[derive(Debug, Default)]
pub struct ProviderHealth {
    failures: HashMap<String, Instant>,
}

impl ProviderHealth {
    pub fn record_failure(&mut self, provider: &str, at: Instant) {
        self.failures.insert(provider.to_string(), at);
    }

    pub fn record_success(&mut self, provider: &str) {
        self.failures.remove(provider);
    }

    pub fn last_failure(&self, provider: &str) -> Option<Instant> {
        self.failures.get(provider).copied()
    }

    pub fn is_cooling_down(&self, provider: &str, now: Instant, cooldown: Duration) -> bool {
        self.failures
            .get(provider)
            .is_some_and(|failed| now.saturating_duration_since(*failed) < cooldown)
    }
}

const QUICK_PROMPT: &str = r#"You are an expert Solidity smart contract security auditor performing a fast triage review.

Focus on the highest-impact, clearly exploitable issues: reentrancy, access control gaps, unchecked external calls, arithmetic errors, oracle manipulation, and unsafe delegatecall. Skip style and gas nits.

Rate each finding Critical, High, Medium, Low, or Info. Do not inflate severity: a pattern that is already mitigated (reentrancy guard, checks-effects-interactions, onlyOwner on an admin setter) is at most Low.

Respond with a single JSON object:
```json
{"summary": "<two sentences>", "findings": [{"title": "...", "severity": "Critical|High|Medium|Low|Info", "description": "...", "location": "<function or line>", "recommendation": "..."}]}
```"#;

const DEEP_PROMPT: &str = r#"You are an expert Solidity smart contract security auditor performing a thorough review.

## Methodology
1. Map the trust model: privileged roles, external entry points, and which addresses are user-controlled.
2. Trace every value flow: ETH and token transfers, mint/burn paths, fee and share calculations.
3. Check ordering: external calls before state updates, cross-function and read-only reentrancy.
4. Check arithmetic: rounding direction, precision loss, unchecked blocks, casting.
5. Check external dependencies: oracle freshness and manipulation, token return values, fee-on-transfer tokens.
6. Check upgradeability and initialization: unprotected initializers, storage collisions, selfdestruct and delegatecall.

Rate each finding Critical, High, Medium, Low, or Info and justify the rating in the description. Do not inflate severity: patterns that are already mitigated are at most Low, and informational observations are Info.

Respond with a single JSON object:
```json
{"summary": "<short paragraph>", "findings": [{"title": "...", "severity": "Critical|High|Medium|Low|Info", "description": "...", "location": "<function or line>", "recommendation": "..."}]}
```"#;

fn system_prompt(depth: Depth) -> &'static str {
    match depth {
        Depth::Quick => QUICK_PROMPT,
        Depth::Deep => DEEP_PROMPT,
    }
}

fn user_message(request: &GenerationRequest<'_>) -> String {
    let context = if request.context.is_null() {
        "none".to_string()
    } else {
        serde_json::to_string_pretty(request.context).unwrap_or_else(|_| request.context.to_string())
    };
    format!(
        "Audit the contract `{}`.\n\nAudit context:\n{context}\n\nSource:\n```solidity\n{}\n```",
        request.contract_name, request.contract_source
    )
}

/// Generates reports through an ordered chain of LLM providers, falling
/// through to the next one on failure and skipping providers that failed
/// within the cooldown period.
pub struct LlmReportGenerator {
    chain: Vec<LlmClient>,
    health: Arc<Mutex<ProviderHealth>>,
    cooldown: Duration,
}

impl LlmReportGenerator {
    pub fn new(chain: Vec<LlmClient>, health: Arc<Mutex<ProviderHealth>>, cooldown: Duration) -> Self {
        Self {
            chain,
            health,
            cooldown,
        }
    }

    fn is_cooling_down(&self, label: &str) -> bool {
        self.health
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_cooling_down(label, Instant::now(), self.cooldown)
    }

    fn record(&self, label: &str, ok: bool) {
        let mut health = self.health.lock().unwrap_or_else(PoisonError::into_inner);
        if ok {
            health.record_success(label);
        } else {
            health.record_failure(label, Instant::now());
        }
    }
}

impl ReportGenerator for LlmReportGenerator {
    async fn preflight(&self) -> Result<()> {
        if self.chain.iter().any(LlmClient::is_configured) {
            Ok(())
        } else {
            Err(Error::config(
                "no LLM provider has an API key; set one or use --reports-dir",
            ))
        }
    }

    async fn generate(&self, request: &GenerationRequest<'_>) -> Result<String> {
        let system = system_prompt(request.depth);
        let message = user_message(request);
        let mut last_error: Option<Error> = None;

        for client in &self.chain {
            let label = client.label();
            if !client.is_configured() {
                debug!(provider = %label, "skipping provider without API key");
                continue;
            }
            if self.is_cooling_down(&label) {
                debug!(provider = %label, "skipping provider in cooldown");
                continue;
            }

            match client.complete(system, &message).await {
                Ok(completion) => {
                    self.record(&label, true);
                    if completion.truncated {
                        warn!(provider = %label, "output hit the token limit, recovering partial findings");
                    }
                    info!(provider = %label, chars = completion.text.len(), "report generated");
                    return Ok(render_response(request.contract_name, &completion.text));
                }
                Err(e) => {
                    warn!(provider = %label, error = %e, "provider failed, trying next");
                    self.record(&label, false);
                    last_error = Some(e);
                }
            }
        }

        Err(Error::generation(match last_error {
            Some(e) => format!("all providers failed, last error: {e}"),
            None => "no provider available (unconfigured or cooling down)".into(),
        }))
    }
}
