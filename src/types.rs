use backoff::backoff::{Backoff, Constant};
use backoff::ExponentialBackoff;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A normalized article extracted from one feed item.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: String,
    pub title: String,
    pub url: Option<String>,
    pub content: String,
    #[serde(rename = "publishedDate")]
    pub published_at: DateTime<Utc>,
}

/// Accumulator threaded through one workflow run. Each stage fills in its
/// slice and hands the context forward; nothing else mutates it.
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    pub target_date: Option<NaiveDate>,
    pub articles: Vec<Article>,
    pub summaries: Vec<String>,
    pub podcast_script: String,
    pub blog_article: String,
    pub intro_text: String,
    pub audio_ref: String,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffStrategy {
    Constant,
    Exponential,
}

/// Per-step retry configuration. Attached to each step invocation;
/// `retry_limit = N` allows at most N + 1 attempts.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub retry_limit: u32,
    pub initial_delay: Duration,
    pub backoff: BackoffStrategy,
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retry_limit: 5,
            initial_delay: Duration::from_secs(10),
            backoff: BackoffStrategy::Exponential,
            timeout: Duration::from_secs(180),
        }
    }
}

impl RetryPolicy {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build the delay sequence for this policy. For the exponential strategy
    /// the delay before retry k is `initial_delay * 2^k`; constant repeats
    /// `initial_delay` unchanged.
    pub fn delays(&self) -> Box<dyn Backoff + Send> {
        match self.backoff {
            BackoffStrategy::Constant => Box::new(Constant::new(self.initial_delay)),
            BackoffStrategy::Exponential => Box::new(ExponentialBackoff {
                current_interval: self.initial_delay,
                initial_interval: self.initial_delay,
                randomization_factor: 0.0,
                multiplier: 2.0,
                max_interval: self.initial_delay * (1u32 << self.retry_limit.min(20)),
                max_elapsed_time: None,
                ..Default::default()
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Succeeded,
    Failed,
}

/// Memoized outcome of one named step within one run, keyed by
/// `(run_key, step_name)`. A succeeded record is never re-executed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub run_key: String,
    pub step_name: String,
    pub status: StepStatus,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
}

impl StepRecord {
    pub fn succeeded(run_key: &str, step_name: &str, result: serde_json::Value) -> Self {
        Self {
            run_key: run_key.to_string(),
            step_name: step_name.to_string(),
            status: StepStatus::Succeeded,
            result: Some(result),
            error: None,
        }
    }

    pub fn failed(run_key: &str, step_name: &str, error: String) -> Self {
        Self {
            run_key: run_key.to_string(),
            step_name: step_name.to_string(),
            status: StepStatus::Failed,
            result: None,
            error: Some(error),
        }
    }
}

/// The bundle persisted once per successful run. Field names match the
/// stored JSON consumed by the syndication renderer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentBundle {
    pub date: NaiveDate,
    pub title: String,
    pub stories: Vec<Article>,
    pub podcast_content: String,
    pub blog_content: String,
    pub intro_content: String,
    pub audio: String,
    pub updated_at: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Feed parse error: {0}")]
    Parse(String),

    #[error("Text generation error: {0}")]
    Generation(String),

    #[error("Speech synthesis error: {0}")]
    Synthesis(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Step `{step}` timed out")]
    Timeout { step: String },

    #[error("Step `{step}` exhausted after {attempts} attempts: {last_error}")]
    StepExhausted {
        step: String,
        attempts: u32,
        last_error: String,
    },

    #[error("No content: {0}")]
    NoContent(String),

    #[error("Audio verification failed: synthesized {expected} bytes, stored {stored:?}")]
    AudioVerification { expected: u64, stored: Option<u64> },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("General error: {0}")]
    General(String),
}

impl WorkflowError {
    /// Only these kinds are allowed to terminate a run; everything else is
    /// absorbed at the component boundary where it occurs.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            WorkflowError::StepExhausted { .. } | WorkflowError::NoContent(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, WorkflowError>;
