//! LLM API interaction.
//!
//! [`AskAsync`] is the seam the summarizer talks to; [`OpenAiClient`] is the
//! production implementation against an OpenAI-compatible
//! `/chat/completions` endpoint. There is no retry layer: a failed request
//! fails the run, and the scheduler decides whether to run again.

use crate::config::AiSettings;
use crate::error::SummarizationError;
use crate::utils::truncate_for_log;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, instrument, warn};

/// A two-part chat prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

/// Trait for async LLM interaction.
///
/// Implementors send a prompt and return the generated text. Empty text is
/// an error, never a valid answer.
pub trait AskAsync {
    async fn ask(&self, prompt: &Prompt) -> Result<String, SummarizationError>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// OpenAI-compatible chat completions client.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(settings: &AiSettings) -> Result<Self, reqwest::Error> {
        let http = Client::builder()
            .user_agent(concat!("weekly_updater/", env!("CARGO_PKG_VERSION")))
            .timeout(settings.timeout)
            .build()?;
        Ok(Self {
            http,
            endpoint: format!("{}/chat/completions", settings.base_url),
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
        })
    }
}

impl AskAsync for OpenAiClient {
    #[instrument(level = "info", skip_all, fields(model = %self.model))]
    async fn ask(&self, prompt: &Prompt) -> Result<String, SummarizationError> {
        let t0 = Instant::now();
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &prompt.system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user,
                },
            ],
        };

        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SummarizationError::Timeout
                } else {
                    SummarizationError::Transport(e.to_string())
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            warn!(
                status = status.as_u16(),
                elapsed_ms = t0.elapsed().as_millis() as u64,
                body = %truncate_for_log(&text, 300),
                "AI endpoint returned an error"
            );
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    SummarizationError::Unauthorized(status.as_u16())
                }
                StatusCode::TOO_MANY_REQUESTS => SummarizationError::RateLimited,
                _ => SummarizationError::Status {
                    status: status.as_u16(),
                    body: truncate_for_log(&text, 300),
                },
            });
        }

        let raw = resp
            .text()
            .await
            .map_err(|e| SummarizationError::Transport(e.to_string()))?;
        let parsed: ChatResponse = serde_json::from_str(&raw).map_err(|e| {
            warn!(error = %e, response_preview = %truncate_for_log(&raw, 300), "Unparseable AI response");
            SummarizationError::Malformed(e.to_string())
        })?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| SummarizationError::Malformed("response has no choices".to_string()))?
            .message
            .content
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(SummarizationError::Empty);
        }

        debug!(
            elapsed_ms = t0.elapsed().as_millis() as u64,
            bytes = text.len(),
            "AI request succeeded"
        );
        Ok(text.trim().to_string())
    }
}
