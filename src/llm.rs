use crate::types::{Result, WorkflowError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tracing::{debug, info};

/// Trait for text-generation backends used by the content pipeline.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate text from a system prompt and a user prompt. `max_tokens`
    /// bounds the output size where the backend supports it.
    async fn generate(
        &self,
        system: &str,
        prompt: &str,
        max_tokens: Option<u32>,
    ) -> Result<String>;
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// Client for an OpenAI-compatible chat-completions endpoint.
pub struct OpenAiGenerator {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiGenerator {
    pub fn new(base_url: String, api_key: String, model: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .expect("Failed to create HTTP client");
        Self {
            client,
            base_url,
            api_key,
            model,
        }
    }
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    async fn generate(
        &self,
        system: &str,
        prompt: &str,
        max_tokens: Option<u32>,
    ) -> Result<String> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            max_tokens,
        };

        debug!(model = %self.model, prompt_len = prompt.len(), "sending generation request");

        let response = self
            .client
            .post(format!(
                "{}/chat/completions",
                self.base_url.trim_end_matches('/')
            ))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(WorkflowError::Generation(format!(
                "API returned {}: {}",
                status, body
            )));
        }

        let parsed: ChatResponse = response.json().await?;
        let text = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| WorkflowError::Generation("response contained no choices".to_string()))?;

        info!(model = %self.model, output_len = text.len(), "generation complete");
        Ok(text)
    }
}

/// Deterministic generator for development and testing. Replies with a
/// recognizable transform of the prompt and can be told to fail the first
/// N calls.
pub struct MockTextGenerator {
    prefix: String,
    response_delay: Duration,
    failures_remaining: AtomicU32,
}

impl MockTextGenerator {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            response_delay: Duration::from_millis(0),
            failures_remaining: AtomicU32::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.response_delay = delay;
        self
    }

    pub fn failing_first(self, count: u32) -> Self {
        self.failures_remaining.store(count, Ordering::SeqCst);
        self
    }
}

#[async_trait]
impl TextGenerator for MockTextGenerator {
    async fn generate(
        &self,
        _system: &str,
        prompt: &str,
        _max_tokens: Option<u32>,
    ) -> Result<String> {
        if self.response_delay > Duration::ZERO {
            tokio::time::sleep(self.response_delay).await;
        }
        let remaining = self.failures_remaining.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures_remaining.store(remaining - 1, Ordering::SeqCst);
            return Err(WorkflowError::Generation("simulated failure".to_string()));
        }
        let first_line = prompt.lines().next().unwrap_or("").trim();
        Ok(format!("{}: {}", self.prefix, first_line))
    }
}
