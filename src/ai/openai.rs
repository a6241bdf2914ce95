//! OpenAI-Compatible HTTP Provider
//!
//! Speaks the Chat Completions shape, which also covers Ollama and most
//! self-hosted gateways via `api_base`. The API key lives in a
//! `SecretString` and is redacted from debug output.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::LlmConfig;
use crate::types::{FolioError, Result};

use super::provider::LlmProvider;

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

pub struct OpenAiProvider {
    api_key: SecretString,
    api_base: String,
    model: String,
    temperature: f32,
    max_tokens: usize,
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("api_key", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .finish()
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: usize,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

impl OpenAiProvider {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("ZIPFOLIO_LLM_API_KEY").ok())
            .ok_or_else(|| {
                FolioError::Config(
                    "LLM API key not found. Set ZIPFOLIO_LLM_API_KEY or llm.api_key".to_string(),
                )
            })?;

        Ok(Self {
            api_key: SecretString::new(api_key),
            api_base: config
                .api_base
                .clone()
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            client: reqwest::Client::new(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn complete(
        &self,
        prompt: &str,
        schema_hint: &str,
        deadline: Duration,
    ) -> Result<String> {
        let system = format!(
            "You are a precise assistant. Respond with JSON matching this shape \
             and nothing else: {}",
            schema_hint
        );

        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt.to_string(),
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        debug!(
            "LLM request to {} (model={}, {} prompt chars)",
            self.api_base,
            self.model,
            prompt.len()
        );

        let url = format!("{}/chat/completions", self.api_base.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&request)
            .timeout(deadline)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FolioError::timeout("llm completion", deadline)
                } else {
                    FolioError::Llm(format!("request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("LLM call failed with {}: {}", status, truncate(&body, 200));
            return Err(FolioError::Llm(format!(
                "provider returned {}: {}",
                status,
                truncate(&body, 200)
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| FolioError::Llm(format!("unreadable response body: {}", e)))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| FolioError::Llm("empty completion".to_string()))
    }

    fn name(&self) -> &str {
        "openai"
    }
}

fn truncate(text: &str, limit: usize) -> String {
    if text.len() <= limit {
        return text.to_string();
    }
    let mut end = limit;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}
