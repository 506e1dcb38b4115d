use crate::aggregator::FeedAggregator;
use crate::clock::Clock;
use crate::config::WorkflowConfig;
use crate::executor::StepExecutor;
use crate::notify::Notifier;
use crate::pipeline::ContentPipeline;
use crate::storage::{audio_object_key, content_record_key, ObjectStore, RecordStore};
use crate::tts::SpeechSynthesizer;
use crate::types::{Article, ContentBundle, Result, RunContext, WorkflowError};
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{info, warn};

/// States of one workflow run, logged at each transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Start,
    FeedsGathered,
    Summarized,
    ScriptsComposed,
    AudioSynthesized,
    Persisted,
    Notified,
    Failed,
}

/// Top-level state machine driving aggregation, summarization, composition,
/// audio synthesis, persistence, and notification for one target date.
pub struct Workflow {
    config: WorkflowConfig,
    clock: Arc<dyn Clock>,
    executor: StepExecutor,
    aggregator: FeedAggregator,
    pipeline: ContentPipeline,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    objects: Arc<dyn ObjectStore>,
    records: Arc<dyn RecordStore>,
    notifier: Arc<dyn Notifier>,
}

impl Workflow {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: WorkflowConfig,
        clock: Arc<dyn Clock>,
        executor: StepExecutor,
        aggregator: FeedAggregator,
        pipeline: ContentPipeline,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        objects: Arc<dyn ObjectStore>,
        records: Arc<dyn RecordStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            config,
            clock,
            executor,
            aggregator,
            pipeline,
            synthesizer,
            objects,
            records,
            notifier,
        }
    }

    /// Execute one run. The target date defaults to the injected clock's
    /// current day. Returns `"OK"` on success; on failure the triggering
    /// error propagates after a best-effort failure notification.
    pub async fn run(&self, target_date: Option<NaiveDate>) -> Result<&'static str> {
        let date = target_date.unwrap_or_else(|| self.clock.now().date_naive());
        let run_key = format!("podcast-{}", date);
        info!(state = ?RunState::Start, %date, run_key, "workflow run starting");

        match self.run_inner(&run_key, date).await {
            Ok(()) => {
                self.notify_best_effort(&format!(
                    "{} {} generated successfully",
                    self.config.podcast_title, date
                ))
                .await;
                info!(state = ?RunState::Notified, run_key, "workflow run complete");
                Ok("OK")
            }
            Err(err) => {
                warn!(
                    state = ?RunState::Failed,
                    run_key,
                    error = %err,
                    fatal = err.is_fatal(),
                    "workflow run failed"
                );
                self.notify_best_effort(&format!(
                    "{} {} failed: {}",
                    self.config.podcast_title, date, err
                ))
                .await;
                Err(err)
            }
        }
    }

    async fn run_inner(&self, run_key: &str, date: NaiveDate) -> Result<()> {
        let mut ctx = RunContext {
            target_date: Some(date),
            ..Default::default()
        };

        // Start -> FeedsGathered. One memoized step per feed; per-feed
        // failures are already isolated inside the aggregator.
        let aggregator = &self.aggregator;
        let mut articles = Vec::new();
        for url in &self.config.feed_urls {
            let step_name = format!("collect feed {}", url);
            let mut collected = self
                .executor
                .execute::<Vec<Article>, _, _>(run_key, &step_name, &self.config.retry, move || {
                    let url = url.clone();
                    async move { Ok(aggregator.collect_isolated(&url, date).await) }
                })
                .await?;
            articles.append(&mut collected);
        }
        if articles.is_empty() {
            return Err(WorkflowError::NoContent(format!(
                "no stories found for {}",
                date
            )));
        }
        ctx.articles = self.pipeline.cap_articles(articles);
        info!(state = ?RunState::FeedsGathered, count = ctx.articles.len(), "feeds gathered");

        // FeedsGathered -> Summarized
        ctx.summaries = self
            .pipeline
            .summarize_articles(run_key, &ctx.articles)
            .await?;
        if ctx.summaries.is_empty() {
            return Err(WorkflowError::NoContent(format!(
                "no summaries produced for {}",
                date
            )));
        }
        info!(state = ?RunState::Summarized, count = ctx.summaries.len(), "stories summarized");

        // Summarized -> ScriptsComposed, with cooldowns between compositions.
        ctx.podcast_script = self
            .pipeline
            .compose_podcast_script(run_key, &ctx.summaries)
            .await?;
        self.pipeline.cooldown().await;
        ctx.blog_article = self
            .pipeline
            .compose_blog_article(run_key, &ctx.summaries)
            .await?;
        self.pipeline.cooldown().await;
        ctx.intro_text = self
            .pipeline
            .compose_intro(run_key, &ctx.podcast_script)
            .await?;
        info!(state = ?RunState::ScriptsComposed, "scripts composed");

        // ScriptsComposed -> AudioSynthesized. Synthesis, storage write, and
        // size verification form one retryable step so a verification
        // failure triggers a fresh synthesis attempt.
        let audio_key = audio_object_key(date, &self.config.environment);
        let script = ctx.podcast_script.clone();
        let key = audio_key.clone();
        let synthesizer = &self.synthesizer;
        let objects = &self.objects;
        self.executor
            .execute::<String, _, _>(
                run_key,
                "create podcast audio",
                &self.config.audio_retry,
                move || {
                    let script = script.clone();
                    let key = key.clone();
                    async move {
                        let audio = synthesizer.synthesize(&script).await?;
                        let expected = audio.len() as u64;
                        objects.put(&key, audio).await?;
                        match objects.head(&key).await? {
                            Some(stored) if stored >= expected => Ok("OK".to_string()),
                            stored => Err(WorkflowError::AudioVerification { expected, stored }),
                        }
                    }
                },
            )
            .await?;
        ctx.audio_ref = audio_key.clone();
        info!(state = ?RunState::AudioSynthesized, key = %audio_key, "audio stored and verified");

        // AudioSynthesized -> Persisted. The bundle is written whole; a
        // re-run for the same date overwrites it atomically.
        ctx.updated_at = Some(self.clock.now());
        let bundle = ContentBundle {
            date,
            title: format!("{} {}", self.config.podcast_title, date),
            stories: ctx.articles.clone(),
            podcast_content: ctx.podcast_script.clone(),
            blog_content: ctx.blog_article.clone(),
            intro_content: ctx.intro_text.clone(),
            audio: ctx.audio_ref.clone(),
            updated_at: ctx
                .updated_at
                .map(|t| t.timestamp_millis())
                .unwrap_or_default(),
        };
        let content_key = content_record_key(&self.config.environment, date);
        let value = serde_json::to_value(&bundle)?;
        let records = &self.records;
        self.executor
            .execute::<String, _, _>(run_key, "save content bundle", &self.config.retry, move || {
                let content_key = content_key.clone();
                let value = value.clone();
                async move {
                    records.put(&content_key, value).await?;
                    Ok("OK".to_string())
                }
            })
            .await?;
        info!(state = ?RunState::Persisted, "content bundle persisted");

        Ok(())
    }

    /// Notification delivery failures are logged and discarded; they never
    /// affect the run outcome.
    async fn notify_best_effort(&self, message: &str) {
        if let Err(err) = self.notifier.notify(message).await {
            warn!(error = %err, "notification delivery failed");
        }
    }
}
