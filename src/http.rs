//! JSON-over-HTTP transport shared by the LLM providers.
//!
//! Only failures that never reached the provider (timeouts, refused
//! connections) are retried here. Any HTTP answer, including 429 and 5xx, is
//! classified and returned at once so the generator can move to the next
//! provider in its chain instead of waiting on backoff.

use crate::error::{Error, Result};
use reqwest::{Client, StatusCode, header};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Upstream error bodies are cut to this many characters in error messages.
const MAX_ERROR_BODY: usize = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 2,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// Backoff before retry number `retry` (1-based), doubling up to the cap.
    pub fn delay(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

#[derive(Clone)]
pub struct Transport {
    client: Client,
    policy: RetryPolicy,
}

impl Transport {
    pub fn new(timeout: Duration, policy: RetryPolicy) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("st-auditbench/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::config(format!("HTTP client: {e}")))?;
        Ok(Self { client, policy })
    }

    /// POST `body` as JSON and decode the JSON answer. `provider` names the
    /// upstream in errors and logs.
    pub async fn post_json<B, R>(
        &self,
        provider: &str,
        url: &str,
        headers: &[(&str, &str)],
        body: &B,
    ) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let mut retry = 0;
        let response = loop {
            let mut request = self.client.post(url).json(body);
            for (name, value) in headers {
                request = request.header(*name, *value);
            }
            match request.send().await {
                Ok(response) => break response,
                Err(e) if (e.is_timeout() || e.is_connect()) && retry < self.policy.retries => {
                    retry += 1;
                    let delay = self.policy.delay(retry);
                    warn!(provider, retry, delay_ms = delay.as_millis() as u64, error = %e, "transport failure, retrying");
                    sleep(delay).await;
                }
                Err(e) => {
                    return Err(Error::Transport {
                        provider: provider.to_string(),
                        message: e.to_string(),
                    });
                }
            }
        };

        let status = response.status();
        debug!(provider, status = status.as_u16(), "provider answered");
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok());
            let body = response.text().await.unwrap_or_default();
            return Err(classify(provider, status, retry_after, &body));
        }

        let text = response.text().await.map_err(|e| Error::Transport {
            provider: provider.to_string(),
            message: format!("reading response body: {e}"),
        })?;
        serde_json::from_str(&text).map_err(|e| Error::malformed("provider response", e))
    }
}

/// Map a non-success answer to the error the provider chain reacts to.
fn classify(provider: &str, status: StatusCode, retry_after: Option<u64>, body: &str) -> Error {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Error::RateLimited {
            provider: provider.to_string(),
            retry_after_secs: retry_after,
        };
    }
    Error::Upstream {
        provider: provider.to_string(),
        status: status.as_u16(),
        body: body.trim().chars().take(MAX_ERROR_BODY).collect(),
    }
}
