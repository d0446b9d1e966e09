use super::models::{Provider, Usage};
use crate::config::{Config, MAX_RETRIES_LIMIT};
use crate::util::truncate;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

/// Response from the backend including content and usage stats
#[derive(Debug, Clone, Default)]
pub struct LlmResponse {
    pub content: String,
    pub usage: Option<Usage>,
    pub model: String,
}

/// A text-generation backend.
///
/// The pipeline and the assistant flows only see this trait; the host
/// constructs a concrete client and injects it.
pub trait TextGenerator: Send + Sync {
    fn complete<'a>(
        &'a self,
        system: &'a str,
        user: &'a str,
        json_mode: bool,
    ) -> BoxFuture<'a, anyhow::Result<LlmResponse>>;
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    max_tokens: u32,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
}

#[derive(Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
    model: Option<String>,
}

#[derive(Deserialize)]
struct Choice {
    message: MessageContent,
}

#[derive(Deserialize)]
struct MessageContent {
    #[serde(default)]
    content: Option<String>,
}

/// Rate limit retry configuration
const INITIAL_BACKOFF_SECS: u64 = 2;
const BACKOFF_MULTIPLIER: u64 = 2;
const MAX_BACKOFF_SECS: u64 = 60;

/// Delay before retry number `retry_count` (1-based), capped at a minute
fn backoff_secs(retry_count: u32) -> u64 {
    BACKOFF_MULTIPLIER
        .checked_pow(retry_count.saturating_sub(1))
        .and_then(|factor| INITIAL_BACKOFF_SECS.checked_mul(factor))
        .map_or(MAX_BACKOFF_SECS, |secs| secs.min(MAX_BACKOFF_SECS))
}

/// HTTP client for an OpenAI-compatible chat-completions endpoint
pub struct LlmClient {
    http: reqwest::Client,
    provider: Provider,
    model: String,
    api_key: String,
    max_retries: u32,
}

impl LlmClient {
    /// Build a client for the provider selected in `config`.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let provider = config.selected_provider();
        let api_key = config.api_key(provider).ok_or_else(|| {
            anyhow::anyhow!(
                "No API key configured for {}. Set {} or add it to the config file.",
                provider.name(),
                provider.api_key_env()
            )
        })?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            provider,
            model: config.selected_model(),
            api_key,
            max_retries: config.max_retries.min(MAX_RETRIES_LIMIT),
        })
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_request(&self, system: &str, user: &str, json_mode: bool) -> ChatRequest {
        let response_format = (json_mode && self.provider.supports_json_mode()).then(|| {
            ResponseFormat {
                format_type: "json_object".to_string(),
            }
        });

        ChatRequest {
            model: self.model.clone(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                Message {
                    role: "user".to_string(),
                    content: user.to_string(),
                },
            ],
            max_tokens: self.provider.max_tokens(),
            stream: false,
            response_format,
        }
    }

    /// Call the endpoint, retrying rate-limited requests with exponential backoff.
    async fn call(&self, system: &str, user: &str, json_mode: bool) -> anyhow::Result<LlmResponse> {
        let request = self.build_request(system, user, json_mode);
        let mut retry_count = 0;

        loop {
            debug!(provider = self.provider.name(), model = %self.model, "sending completion request");
            let response = self
                .http
                .post(self.provider.endpoint())
                .header("Content-Type", "application/json")
                .header("Authorization", format!("Bearer {}", self.api_key))
                .json(&request)
                .send()
                .await?;

            let status = response.status();
            let text = response.text().await?;

            if status.is_success() {
                return parse_chat_response(&text);
            }

            if status.as_u16() == 429 && retry_count < self.max_retries {
                retry_count += 1;
                let retry_after =
                    parse_retry_after(&text).unwrap_or_else(|| backoff_secs(retry_count));
                warn!(
                    provider = self.provider.name(),
                    retry_after_secs = retry_after,
                    attempt = retry_count,
                    max_retries = self.max_retries,
                    "rate limited; retrying"
                );
                tokio::time::sleep(Duration::from_secs(retry_after)).await;
                continue;
            }

            return Err(describe_http_error(status.as_u16(), retry_count, &text));
        }
    }
}

impl TextGenerator for LlmClient {
    fn complete<'a>(
        &'a self,
        system: &'a str,
        user: &'a str,
        json_mode: bool,
    ) -> BoxFuture<'a, anyhow::Result<LlmResponse>> {
        Box::pin(self.call(system, user, json_mode))
    }
}

/// Defers building the [`LlmClient`] until the first completion, so runs
/// that never reach the backend (no consent, clean file) need no API key.
pub struct LazyLlmClient {
    config: Config,
    client: OnceCell<LlmClient>,
}

impl LazyLlmClient {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            client: OnceCell::new(),
        }
    }

    async fn client(&self) -> anyhow::Result<&LlmClient> {
        self.client
            .get_or_try_init(|| async { LlmClient::from_config(&self.config) })
            .await
    }
}

impl TextGenerator for LazyLlmClient {
    fn complete<'a>(
        &'a self,
        system: &'a str,
        user: &'a str,
        json_mode: bool,
    ) -> BoxFuture<'a, anyhow::Result<LlmResponse>> {
        Box::pin(async move { self.client().await?.call(system, user, json_mode).await })
    }
}

fn parse_chat_response(text: &str) -> anyhow::Result<LlmResponse> {
    let parsed: ChatResponse = serde_json::from_str(text).map_err(|e| {
        anyhow::anyhow!("Failed to parse backend response: {}\n{}", e, truncate(text, 200))
    })?;

    let content = parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .unwrap_or_default();

    Ok(LlmResponse {
        content,
        usage: parsed.usage,
        model: parsed.model.unwrap_or_default(),
    })
}

fn describe_http_error(status: u16, retry_count: u32, text: &str) -> anyhow::Error {
    let message = match status {
        401 | 403 => "Invalid API key. Check the key configured for this provider.".to_string(),
        429 => format!(
            "Rate limited by the backend after {} retries. Try again in a few minutes.",
            retry_count
        ),
        500..=599 => format!(
            "Backend server error ({}). The service may be temporarily unavailable.",
            status
        ),
        _ => format!("API error {}: {}", status, truncate(text, 200)),
    };
    anyhow::anyhow!("{}", message)
}

/// Extract a retry-after hint (in seconds) from an error body
fn parse_retry_after(text: &str) -> Option<u64> {
    let text_lower = text.to_lowercase();
    let pos = text_lower.find("retry")?;
    text_lower[pos..]
        .split_whitespace()
        .skip(1)
        .take(5)
        .filter_map(|word| {
            word.trim_matches(|c: char| !c.is_ascii_digit())
                .parse::<u64>()
                .ok()
        })
        .find(|secs| *secs > 0 && *secs < 300)
}
