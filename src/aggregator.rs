use crate::types::{Article, Result, WorkflowError};
use async_trait::async_trait;
use chrono::NaiveDate;
use feed_rs::parser;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Retrieves the raw body of one feed URL.
#[async_trait]
pub trait FeedFetch: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String>;
}

pub struct HttpFeedFetcher {
    client: Client,
}

impl HttpFeedFetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> Self {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .build()
            .expect("Failed to create HTTP client");
        Self { client }
    }
}

impl Default for HttpFeedFetcher {
    fn default() -> Self {
        Self::new("rss-podcast/1.0", Duration::from_secs(30))
    }
}

#[async_trait]
impl FeedFetch for HttpFeedFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(WorkflowError::General(format!(
                "HTTP {}: {}",
                status,
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }
        Ok(response.text().await?)
    }
}

/// Fetches feeds, filters items to the target date, and normalizes surviving
/// items into [`Article`]s. Failures are isolated per feed.
pub struct FeedAggregator {
    fetcher: Arc<dyn FeedFetch>,
}

impl FeedAggregator {
    pub fn new(fetcher: Arc<dyn FeedFetch>) -> Self {
        Self { fetcher }
    }

    /// Collect same-day articles from every feed, preserving feed input order
    /// and item order within each feed. A failing feed contributes nothing.
    pub async fn aggregate(&self, urls: &[String], target_date: NaiveDate) -> Vec<Article> {
        let mut articles = Vec::new();
        for url in urls {
            let mut items = self.collect_isolated(url, target_date).await;
            articles.append(&mut items);
        }
        info!(count = articles.len(), %target_date, "aggregated articles");
        articles
    }

    /// Fetch and extract one feed. Errors propagate to the caller.
    pub async fn collect(&self, url: &str, target_date: NaiveDate) -> Result<Vec<Article>> {
        let body = self.fetcher.fetch(url).await?;
        let articles = extract_articles(&body, target_date)?;
        debug!(feed = url, count = articles.len(), "collected feed");
        Ok(articles)
    }

    /// Fetch and extract one feed, degrading any fetch or parse error to an
    /// empty list so a single bad feed never aborts the aggregation.
    pub async fn collect_isolated(&self, url: &str, target_date: NaiveDate) -> Vec<Article> {
        match self.collect(url, target_date).await {
            Ok(articles) => articles,
            Err(err) => {
                warn!(feed = url, error = %err, "feed unavailable, skipping");
                Vec::new()
            }
        }
    }
}

/// Parse a feed body and keep entries whose publish day (normalized to UTC)
/// equals `target_date`. Entries without a parsable date or with empty
/// content are dropped.
pub fn extract_articles(body: &str, target_date: NaiveDate) -> Result<Vec<Article>> {
    let feed = parser::parse(body.as_bytes())
        .map_err(|e| WorkflowError::Parse(format!("Failed to parse feed: {}", e)))?;

    let articles = feed
        .entries
        .into_iter()
        .filter_map(|entry| article_from_entry(entry, target_date))
        .collect();

    Ok(articles)
}

fn article_from_entry(entry: feed_rs::model::Entry, target_date: NaiveDate) -> Option<Article> {
    let published = entry.published.or(entry.updated)?;
    if published.date_naive() != target_date {
        return None;
    }

    let title = entry
        .title
        .map(|t| t.content)
        .unwrap_or_else(|| "Untitled".to_string());
    let url = entry.links.first().map(|l| l.href.clone());

    // Richest available field first: full content body, then the summary.
    let raw = entry
        .content
        .and_then(|c| c.body)
        .or_else(|| entry.summary.map(|s| s.content))
        .unwrap_or_default();
    let content = normalize_content(&raw);
    if content.trim().is_empty() {
        return None;
    }

    let id = if entry.id.is_empty() {
        Uuid::new_v4().to_string()
    } else {
        entry.id
    };

    Some(Article {
        id,
        title,
        url,
        content,
        published_at: published,
    })
}

/// Convert HTML-looking content to plain text; pass plain text through.
pub fn normalize_content(raw: &str) -> String {
    if raw.contains('<') && raw.contains('>') {
        html2text::from_read(raw.as_bytes(), 80)
    } else {
        raw.to_string()
    }
}
