use crate::types::{Result, RetryPolicy, WorkflowError};
use std::env;
use std::time::Duration;
use url::Url;

/// Stock feed list used when `FEED_URLS` is not set.
const DEFAULT_FEEDS: &[&str] = &[
    "https://lutaonan.com/rss.xml",
    "https://blog.ursb.me/feed.xml",
    "https://www.ruanyifeng.com/blog/atom.xml",
    "https://luolei.org/rss",
    "https://cprss.s3.amazonaws.com/javascriptweekly.com.xml",
    "https://cprss.s3.amazonaws.com/frontendfoc.us.xml",
    "https://web-design-weekly.com/feed/",
    "https://cprss.s3.amazonaws.com/react.statuscode.com.xml",
    "https://cprss.s3.amazonaws.com/nodeweekly.com.xml",
];

/// Environment-derived configuration for one workflow deployment.
#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    pub feed_urls: Vec<String>,
    pub environment: String,
    pub podcast_title: String,
    pub openai_base_url: String,
    pub openai_api_key: String,
    pub openai_model: String,
    pub openai_max_tokens: u32,
    pub tts_endpoint: String,
    pub voice_id: String,
    pub speech_rate: String,
    pub webhook_url: String,
    pub keep_days: u32,
    pub max_articles: usize,
    pub cooldown: Duration,
    pub data_dir: String,
    pub retry: RetryPolicy,
    pub audio_retry: RetryPolicy,
}

impl WorkflowConfig {
    pub fn from_env() -> Result<Self> {
        // Environment variables may also be set system-wide; a missing .env
        // is fine.
        dotenvy::dotenv().ok();

        let feed_urls: Vec<String> = match env::var("FEED_URLS") {
            Ok(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            Err(_) => DEFAULT_FEEDS.iter().map(|s| s.to_string()).collect(),
        };
        for url in &feed_urls {
            Url::parse(url)
                .map_err(|e| WorkflowError::Config(format!("invalid feed URL `{}`: {}", url, e)))?;
        }

        let retry = RetryPolicy::default();
        let audio_retry = RetryPolicy::default().with_timeout(Duration::from_secs(300));

        Ok(Self {
            feed_urls,
            environment: var_or("RUN_ENV", "production"),
            podcast_title: var_or("PODCAST_TITLE", "Daily RSS Podcast"),
            openai_base_url: required("OPENAI_BASE_URL")?,
            openai_api_key: required("OPENAI_API_KEY")?,
            openai_model: required("OPENAI_MODEL")?,
            openai_max_tokens: parse_or("OPENAI_MAX_TOKENS", 4096)?,
            tts_endpoint: required("TTS_ENDPOINT")?,
            voice_id: var_or("AUDIO_VOICE_ID", "en-US-JennyNeural"),
            speech_rate: var_or("AUDIO_SPEED", "10%"),
            webhook_url: required("NOTIFY_WEBHOOK")?,
            keep_days: parse_or("KEEP_DAYS", 30)?,
            max_articles: parse_or("MAX_ARTICLES", 10)?,
            cooldown: Duration::from_secs(parse_or("COOLDOWN_SECONDS", 10)?),
            data_dir: var_or("DATA_DIR", "./data"),
            retry,
            audio_retry,
        })
    }
}

fn required(name: &str) -> Result<String> {
    env::var(name).map_err(|_| WorkflowError::Config(format!("{} is not set", name)))
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parse_or<T: std::str::FromStr>(name: &str, default: T) -> Result<T> {
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| WorkflowError::Config(format!("{} is not a valid number: {}", name, raw))),
        Err(_) => Ok(default),
    }
}
