//! Chat-completion client for the providers a report generator can use.

use crate::error::{Error, Result};
use crate::http::{RetryPolicy, Transport};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::debug;

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Anthropic,
    #[default]
    OpenRouter,
    /// Any OpenAI-compatible server, local or hosted.
    #[serde(rename = "openai")]
    OpenAi,
}

impl Provider {
    fn default_base_url(&self) -> &'static str {
        match self {
            Self::Anthropic => "https://api.anthropic.com/v1",
            Self::OpenRouter => "https://openrouter.ai/api/v1",
            Self::OpenAi => "http://localhost:11434/v1",
        }
    }

    fn default_api_key_env(&self) -> &'static str {
        match self {
            Self::Anthropic => "ANTHROPIC_API_KEY",
            Self::OpenRouter => "OPENROUTER_API_KEY",
            Self::OpenAi => "OPENAI_API_KEY",
        }
    }

    /// Model used when only `--provider` is given on the command line.
    pub fn default_model(&self) -> &'static str {
        match self {
            Self::Anthropic => "claude-sonnet-4-5",
            Self::OpenRouter | Self::OpenAi => "anthropic/claude-sonnet-4.5",
        }
    }

    /// Parse a CLI provider name; unknown names select OpenRouter.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "anthropic" => Self::Anthropic,
            "openai" => Self::OpenAi,
            _ => Self::OpenRouter,
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Anthropic => "anthropic",
            Self::OpenRouter => "openrouter",
            Self::OpenAi => "openai",
        })
    }
}

/// Model output plus whether it was cut off by the token limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub truncated: bool,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct MessagesBody<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: [Message<'a>; 1],
}

#[derive(Deserialize)]
struct MessagesReply {
    content: Vec<ContentBlock>,
    stop_reason: Option<String>,
}

#[derive(Deserialize)]
struct ContentBlock {
    text: Option<String>,
}

#[derive(Serialize)]
struct ChatBody<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: [Message<'a>; 2],
}

#[derive(Deserialize)]
struct ChatReply {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

impl MessagesReply {
    fn into_completion(self) -> Result<Completion> {
        let text = self
            .content
            .into_iter()
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("\n");
        if text.trim().is_empty() {
            return Err(Error::malformed("provider response", "no text content"));
        }
        Ok(Completion {
            text,
            truncated: self.stop_reason.as_deref() == Some("max_tokens"),
        })
    }
}

impl ChatReply {
    fn into_completion(self) -> Result<Completion> {
        let choice = self
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| Error::malformed("provider response", "no choices"))?;
        let text = choice
            .message
            .content
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| Error::malformed("provider response", "empty message"))?;
        Ok(Completion {
            text,
            truncated: choice.finish_reason.as_deref() == Some("length"),
        })
    }
}

pub struct LlmClient {
    provider: Provider,
    api_key: String,
    model: String,
    max_tokens: u32,
    base_url: String,
    transport: Transport,
}

impl LlmClient {
    pub fn new(
        provider: Provider,
        api_key: String,
        model: String,
        max_tokens: u32,
        base_url: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let base_url = base_url
            .unwrap_or_else(|| provider.default_base_url().into())
            .trim_end_matches('/')
            .to_string();
        Ok(Self {
            transport: Transport::new(timeout, RetryPolicy::default())?,
            provider,
            api_key,
            model,
            max_tokens,
            base_url,
        })
    }

    /// The API key comes from `api_key_env`, or the provider's conventional
    /// variable. A missing key leaves the client unconfigured, not broken.
    pub fn from_config(
        provider: Provider,
        model: String,
        max_tokens: u32,
        api_key_env: Option<String>,
        base_url: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let env_var = api_key_env.unwrap_or_else(|| provider.default_api_key_env().into());
        let api_key = std::env::var(&env_var).unwrap_or_default();
        Self::new(provider, api_key, model, max_tokens, base_url, timeout)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// `provider/model`, the key used for provider health tracking.
    pub fn label(&self) -> String {
        format!("{}/{}", self.provider, self.model)
    }

    /// Hosted providers need a key; a local OpenAI-compatible server may not.
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty() || self.provider == Provider::OpenAi
    }

    pub async fn complete(&self, system: &str, user: &str) -> Result<Completion> {
        debug!(provider = %self.provider, model = %self.model, "requesting completion");
        let name = self.provider.to_string();
        match self.provider {
            Provider::Anthropic => {
                let body = MessagesBody {
                    model: &self.model,
                    max_tokens: self.max_tokens,
                    system,
                    messages: [Message {
                        role: "user",
                        content: user,
                    }],
                };
                let reply: MessagesReply = self
                    .transport
                    .post_json(
                        &name,
                        &format!("{}/messages", self.base_url),
                        &[
                            ("x-api-key", self.api_key.as_str()),
                            ("anthropic-version", ANTHROPIC_VERSION),
                        ],
                        &body,
                    )
                    .await?;
                reply.into_completion()
            }
            Provider::OpenRouter | Provider::OpenAi => {
                let body = ChatBody {
                    model: &self.model,
                    max_tokens: self.max_tokens,
                    messages: [
                        Message {
                            role: "system",
                            content: system,
                        },
                        Message {
                            role: "user",
                            content: user,
                        },
                    ],
                };
                let bearer = format!("Bearer {}", self.api_key);
                let mut headers = Vec::new();
                if !self.api_key.is_empty() {
                    headers.push(("authorization", bearer.as_str()));
                }
                let reply: ChatReply = self
                    .transport
                    .post_json(
                        &name,
                        &format!("{}/chat/completions", self.base_url),
                        &headers,
                        &body,
                    )
                    .await?;
                reply.into_completion()
            }
        }
    }
}
