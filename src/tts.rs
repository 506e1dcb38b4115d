use crate::types::{Result, WorkflowError};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::info;

/// Trait for narrated-audio backends.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text` into an audio payload (MP3 bytes).
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>>;
}

#[derive(Serialize)]
struct SynthesisRequest<'a> {
    text: &'a str,
    voice: &'a str,
    rate: &'a str,
}

/// Client for an HTTP speech-synthesis endpoint that accepts
/// `{text, voice, rate}` and responds with raw audio bytes.
pub struct HttpSynthesizer {
    client: Client,
    endpoint: String,
    voice: String,
    rate: String,
}

impl HttpSynthesizer {
    pub fn new(endpoint: String, voice: String, rate: String) -> Self {
        // Synthesis is the slowest upstream call; give it generous room and
        // let the step timeout bound it.
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .expect("Failed to create HTTP client");
        Self {
            client,
            endpoint,
            voice,
            rate,
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for HttpSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        let request = SynthesisRequest {
            text,
            voice: &self.voice,
            rate: &self.rate,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(WorkflowError::Synthesis(format!(
                "synthesis endpoint returned {}: {}",
                status, body
            )));
        }

        let bytes = response.bytes().await?.to_vec();
        if bytes.is_empty() {
            return Err(WorkflowError::Synthesis(
                "synthesis endpoint returned an empty payload".to_string(),
            ));
        }
        info!(bytes = bytes.len(), voice = %self.voice, "audio synthesized");
        Ok(bytes)
    }
}
