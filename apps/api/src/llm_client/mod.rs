/// LLM Client: the single point of entry for remote completion calls.
///
/// No other module may call the completion endpoint directly.
/// Sampling parameters are fixed here.
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod prompts;

const MAX_TOKENS: u32 = 500;
const TEMPERATURE: f64 = 0.3;
const TOP_P: f64 = 1.0;
const FREQUENCY_PENALTY: f64 = 0.0;
const PRESENCE_PENALTY: f64 = 0.0;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("malformed response envelope: {0}")]
    MalformedEnvelope(String),
}

/// Bounds on how hard a single completion is retried.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    /// Exponential backoff before attempt `attempt` (1-based retries): base, 2×base, 4×base...
    fn delay_before(&self, attempt: u32) -> Duration {
        self.base_delay * (1u32 << (attempt - 1).min(16))
    }
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    prompt: &'a str,
    max_tokens: u32,
    temperature: f64,
    top_p: f64,
    frequency_penalty: f64,
    presence_penalty: f64,
}

#[derive(Debug, Deserialize)]
pub struct CompletionResponse {
    pub choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub text: String,
}

impl CompletionResponse {
    /// Text of the first candidate that carries any content.
    pub fn text(&self) -> Option<&str> {
        self.choices
            .iter()
            .map(|c| c.text.as_str())
            .find(|t| !t.trim().is_empty())
    }
}

/// Wraps the remote completion endpoint with timeout, retry and envelope decoding.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    endpoint: String,
    api_key: String,
    retry: RetryPolicy,
}

impl LlmClient {
    pub fn new(
        endpoint: String,
        api_key: String,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            endpoint,
            api_key,
            retry,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Sends `prompt` and returns the decoded envelope.
    /// Retries transport failures, 429 and 5xx with exponential backoff; any
    /// other non-2xx status is returned immediately with its body verbatim.
    pub async fn complete(&self, prompt: &str) -> Result<CompletionResponse, LlmError> {
        let request_body = CompletionRequest {
            prompt,
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
            top_p: TOP_P,
            frequency_penalty: FREQUENCY_PENALTY,
            presence_penalty: PRESENCE_PENALTY,
        };

        let attempts = self.retry.max_attempts.max(1);
        let mut last_error: Option<LlmError> = None;

        for attempt in 0..attempts {
            if attempt > 0 {
                let delay = self.retry.delay_before(attempt);
                warn!(
                    "Completion attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(&self.endpoint)
                .bearer_auth(&self.api_key)
                .json(&request_body)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    warn!("Completion transport error: {e}");
                    last_error = Some(LlmError::Transport(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("Completion API returned {}: {}", status, body);
                last_error = Some(LlmError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            let body = response.text().await?;

            if !status.is_success() {
                return Err(LlmError::Api {
                    status: status.as_u16(),
                    message: body,
                });
            }

            let envelope = decode_envelope(&body)?;
            debug!(
                "Completion succeeded: {} candidate(s), {} bytes",
                envelope.choices.len(),
                body.len()
            );
            return Ok(envelope);
        }

        Err(last_error.unwrap_or_else(|| {
            LlmError::MalformedEnvelope("no completion attempt was made".to_string())
        }))
    }
}

/// Decodes `{"choices": [{"text": ...}, ...]}`; an empty candidate list is malformed.
pub fn decode_envelope(body: &str) -> Result<CompletionResponse, LlmError> {
    let envelope: CompletionResponse =
        serde_json::from_str(body).map_err(|e| LlmError::MalformedEnvelope(e.to_string()))?;
    if envelope.choices.is_empty() {
        return Err(LlmError::MalformedEnvelope(
            "response contained no choices".to_string(),
        ));
    }
    Ok(envelope)
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
pub fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}
