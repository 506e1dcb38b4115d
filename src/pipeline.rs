use crate::executor::StepExecutor;
use crate::llm::TextGenerator;
use crate::prompts;
use crate::types::{Article, Result, RetryPolicy};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Separator between per-article summaries when they are joined for the
/// composition prompts.
pub const SUMMARY_SEPARATOR: &str = "\n\n---\n\n";

/// Sequences the summarization stages over aggregated articles. Every
/// generation call is a retryable, memoized step; a cooldown follows each
/// call to protect the rate-limited upstream model.
pub struct ContentPipeline {
    generator: Arc<dyn TextGenerator>,
    executor: StepExecutor,
    policy: RetryPolicy,
    max_articles: usize,
    cooldown: Duration,
    max_tokens: u32,
}

impl ContentPipeline {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        executor: StepExecutor,
        policy: RetryPolicy,
        max_articles: usize,
        cooldown: Duration,
        max_tokens: u32,
    ) -> Self {
        Self {
            generator,
            executor,
            policy,
            max_articles,
            cooldown,
            max_tokens,
        }
    }

    /// Truncate to the configured maximum article count, preserving
    /// aggregation order. No ranking.
    pub fn cap_articles(&self, mut articles: Vec<Article>) -> Vec<Article> {
        if articles.len() > self.max_articles {
            debug!(
                total = articles.len(),
                kept = self.max_articles,
                "capping article count"
            );
            articles.truncate(self.max_articles);
        }
        articles
    }

    /// Summarize each article sequentially, one memoized step per article.
    pub async fn summarize_articles(
        &self,
        run_key: &str,
        articles: &[Article],
    ) -> Result<Vec<String>> {
        let mut summaries = Vec::with_capacity(articles.len());
        for article in articles {
            let step_name = format!("summarize story {}", article.id);
            let prompt = prompts::format_article(&article.title, &article.content);
            let summary = self
                .executor
                .execute(run_key, &step_name, &self.policy, || {
                    let prompt = prompt.clone();
                    async move {
                        self.generator
                            .generate(prompts::SUMMARIZE_STORY, &prompt, None)
                            .await
                    }
                })
                .await?;
            info!(article = %article.id, "story summarized");
            summaries.push(summary);
            self.cooldown().await;
        }
        Ok(summaries)
    }

    pub async fn compose_podcast_script(
        &self,
        run_key: &str,
        summaries: &[String],
    ) -> Result<String> {
        let joined = summaries.join(SUMMARY_SEPARATOR);
        self.step_generate(
            run_key,
            "create podcast content",
            prompts::COMPOSE_PODCAST,
            joined,
            Some(self.max_tokens),
        )
        .await
    }

    pub async fn compose_blog_article(
        &self,
        run_key: &str,
        summaries: &[String],
    ) -> Result<String> {
        let joined = summaries.join(SUMMARY_SEPARATOR);
        self.step_generate(
            run_key,
            "create blog content",
            prompts::COMPOSE_BLOG,
            joined,
            Some(self.max_tokens),
        )
        .await
    }

    /// The intro consumes the finished podcast script only.
    pub async fn compose_intro(&self, run_key: &str, podcast_script: &str) -> Result<String> {
        self.step_generate(
            run_key,
            "create intro content",
            prompts::COMPOSE_INTRO,
            podcast_script.to_string(),
            None,
        )
        .await
    }

    /// Wall-clock delay between dependent generation calls.
    pub async fn cooldown(&self) {
        if self.cooldown > Duration::ZERO {
            tokio::time::sleep(self.cooldown).await;
        }
    }

    async fn step_generate(
        &self,
        run_key: &str,
        step_name: &str,
        system: &'static str,
        prompt: String,
        max_tokens: Option<u32>,
    ) -> Result<String> {
        self.executor
            .execute(run_key, step_name, &self.policy, || {
                let prompt = prompt.clone();
                async move { self.generator.generate(system, &prompt, max_tokens).await }
            })
            .await
    }
}
