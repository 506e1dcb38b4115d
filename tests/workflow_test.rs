use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use rss_podcast::types::{BackoffStrategy, Result, RetryPolicy, WorkflowError};
use rss_podcast::{
    audio_object_key, content_record_key, past_days, ContentPipeline, FeedAggregator, FeedFetch,
    FixedClock, MemoryObjectStore, MemoryRecordStore, MemoryStepStore, Notifier, ObjectStore,
    RecordStore, SpeechSynthesizer, StepExecutor, TextGenerator, Workflow, WorkflowConfig,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn target() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 21).unwrap()
}

fn rss_fixture() -> String {
    r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Example Blog</title>
    <item>
      <title>Matching story</title>
      <link>https://example.com/matching</link>
      <guid>story-1</guid>
      <description>A story published today.</description>
      <pubDate>Fri, 21 Mar 2025 08:00:00 GMT</pubDate>
    </item>
    <item>
      <title>Old story</title>
      <link>https://example.com/old</link>
      <guid>story-2</guid>
      <description>Published the day before.</description>
      <pubDate>Thu, 20 Mar 2025 08:00:00 GMT</pubDate>
    </item>
  </channel>
</rss>"#
        .to_string()
}

struct StubFetch {
    feeds: HashMap<String, std::result::Result<String, String>>,
}

#[async_trait]
impl FeedFetch for StubFetch {
    async fn fetch(&self, url: &str) -> Result<String> {
        match self.feeds.get(url) {
            Some(Ok(body)) => Ok(body.clone()),
            Some(Err(message)) => Err(WorkflowError::General(message.clone())),
            None => Err(WorkflowError::General(format!("unknown feed {}", url))),
        }
    }
}

struct CountingGenerator {
    calls: AtomicU32,
}

impl CountingGenerator {
    fn new() -> Self {
        Self {
            calls: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl TextGenerator for CountingGenerator {
    async fn generate(
        &self,
        _system: &str,
        prompt: &str,
        _max_tokens: Option<u32>,
    ) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let first_line = prompt.lines().next().unwrap_or("").trim();
        Ok(format!("generated: {}", first_line))
    }
}

struct StubSynthesizer {
    payload: Vec<u8>,
    fail: bool,
    calls: AtomicU32,
}

impl StubSynthesizer {
    fn ok(payload: Vec<u8>) -> Self {
        Self {
            payload,
            fail: false,
            calls: AtomicU32::new(0),
        }
    }

    fn failing() -> Self {
        Self {
            payload: Vec::new(),
            fail: true,
            calls: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for StubSynthesizer {
    async fn synthesize(&self, _text: &str) -> Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(WorkflowError::Synthesis("voice service down".to_string()))
        } else {
            Ok(self.payload.clone())
        }
    }
}

/// Object store whose reported size is always one byte short.
struct TruncatingObjectStore {
    inner: MemoryObjectStore,
}

#[async_trait]
impl ObjectStore for TruncatingObjectStore {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        self.inner.put(key, bytes).await
    }

    async fn head(&self, key: &str) -> Result<Option<u64>> {
        Ok(self.inner.head(key).await?.map(|size| size - 1))
    }
}

struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
    fail: bool,
}

impl RecordingNotifier {
    fn new() -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    fn failing() -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
            fail: true,
        }
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, message: &str) -> Result<()> {
        self.messages.lock().unwrap().push(message.to_string());
        if self.fail {
            Err(WorkflowError::General("webhook unreachable".to_string()))
        } else {
            Ok(())
        }
    }
}

fn test_config(feed_urls: Vec<String>) -> WorkflowConfig {
    let retry = RetryPolicy {
        retry_limit: 1,
        initial_delay: Duration::from_millis(10),
        backoff: BackoffStrategy::Exponential,
        timeout: Duration::from_secs(60),
    };
    WorkflowConfig {
        feed_urls,
        environment: "test".to_string(),
        podcast_title: "Daily RSS Podcast".to_string(),
        openai_base_url: "http://localhost".to_string(),
        openai_api_key: "key".to_string(),
        openai_model: "model".to_string(),
        openai_max_tokens: 512,
        tts_endpoint: "http://localhost/tts".to_string(),
        voice_id: "voice".to_string(),
        speech_rate: "10%".to_string(),
        webhook_url: "http://localhost/hook".to_string(),
        keep_days: 30,
        max_articles: 10,
        cooldown: Duration::ZERO,
        data_dir: "./data".to_string(),
        audio_retry: retry.clone().with_timeout(Duration::from_secs(120)),
        retry,
    }
}

struct Parts {
    config: WorkflowConfig,
    step_store: Arc<MemoryStepStore>,
    fetch: Arc<StubFetch>,
    generator: Arc<CountingGenerator>,
    synthesizer: Arc<StubSynthesizer>,
    objects: Arc<dyn ObjectStore>,
    records: Arc<MemoryRecordStore>,
    notifier: Arc<RecordingNotifier>,
}

impl Parts {
    fn build(self) -> Workflow {
        let executor = StepExecutor::new(self.step_store);
        let pipeline = ContentPipeline::new(
            self.generator,
            executor.clone(),
            self.config.retry.clone(),
            self.config.max_articles,
            self.config.cooldown,
            self.config.openai_max_tokens,
        );
        Workflow::new(
            self.config,
            Arc::new(FixedClock(
                Utc.with_ymd_and_hms(2025, 3, 21, 12, 0, 0).unwrap(),
            )),
            executor,
            FeedAggregator::new(self.fetch),
            pipeline,
            self.synthesizer,
            self.objects,
            self.records,
            self.notifier,
        )
    }
}

fn happy_parts() -> Parts {
    let mut feeds = HashMap::new();
    feeds.insert("https://a.example/rss".to_string(), Ok(rss_fixture()));
    feeds.insert(
        "https://b.example/rss".to_string(),
        Err("connection refused".to_string()),
    );
    Parts {
        config: test_config(vec![
            "https://a.example/rss".to_string(),
            "https://b.example/rss".to_string(),
        ]),
        step_store: Arc::new(MemoryStepStore::new()),
        fetch: Arc::new(StubFetch { feeds }),
        generator: Arc::new(CountingGenerator::new()),
        synthesizer: Arc::new(StubSynthesizer::ok(vec![0u8; 2048])),
        objects: Arc::new(MemoryObjectStore::new()),
        records: Arc::new(MemoryRecordStore::new()),
        notifier: Arc::new(RecordingNotifier::new()),
    }
}

#[tokio::test(start_paused = true)]
async fn successful_run_persists_bundle_and_notifies() -> Result<()> {
    let parts = happy_parts();
    let records = parts.records.clone();
    let objects = parts.objects.clone();
    let notifier = parts.notifier.clone();
    let workflow = parts.build();

    let ack = workflow.run(Some(target())).await?;
    assert_eq!(ack, "OK");

    let bundle = records
        .get(&content_record_key("test", target()))
        .await?
        .expect("bundle persisted");
    assert_eq!(bundle["date"], "2025-03-21");
    assert_eq!(bundle["title"], "Daily RSS Podcast 2025-03-21");
    assert_eq!(bundle["audio"], "2025/03/21/test/podcast-2025-03-21.mp3");
    assert_eq!(bundle["stories"].as_array().unwrap().len(), 1);
    assert!(bundle["podcastContent"].as_str().unwrap().starts_with("generated:"));
    assert!(bundle["blogContent"].is_string());
    assert!(bundle["introContent"].is_string());
    assert_eq!(
        bundle["updatedAt"].as_i64().unwrap(),
        Utc.with_ymd_and_hms(2025, 3, 21, 12, 0, 0)
            .unwrap()
            .timestamp_millis()
    );

    // Audio stored under the dated key.
    let stored = objects
        .head("2025/03/21/test/podcast-2025-03-21.mp3")
        .await?;
    assert_eq!(stored, Some(2048));

    let messages = notifier.messages.lock().unwrap();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("generated successfully"));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn empty_article_set_fails_fast_with_no_content() {
    let mut parts = happy_parts();
    // Both feeds fail: aggregation degrades each to an empty list.
    let mut feeds = HashMap::new();
    feeds.insert(
        "https://a.example/rss".to_string(),
        Err("down".to_string()),
    );
    feeds.insert(
        "https://b.example/rss".to_string(),
        Err("down".to_string()),
    );
    parts.fetch = Arc::new(StubFetch { feeds });
    let generator = parts.generator.clone();
    let notifier = parts.notifier.clone();
    let workflow = parts.build();

    let err = workflow.run(Some(target())).await.unwrap_err();
    assert!(matches!(err, WorkflowError::NoContent(_)));
    assert!(err.is_fatal());

    // Summarization was never attempted.
    assert_eq!(generator.calls.load(Ordering::SeqCst), 0);

    let messages = notifier.messages.lock().unwrap();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("failed"));
}

#[tokio::test(start_paused = true)]
async fn short_stored_audio_is_rejected_and_retried_to_exhaustion() {
    let mut parts = happy_parts();
    parts.objects = Arc::new(TruncatingObjectStore {
        inner: MemoryObjectStore::new(),
    });
    let synthesizer = parts.synthesizer.clone();
    let workflow = parts.build();

    let err = workflow.run(Some(target())).await.unwrap_err();
    match err {
        WorkflowError::StepExhausted {
            step, last_error, ..
        } => {
            assert_eq!(step, "create podcast audio");
            assert!(last_error.contains("Audio verification failed"));
        }
        other => panic!("expected StepExhausted, got {:?}", other),
    }

    // Each retry re-synthesized: retry_limit 1 means two attempts.
    assert_eq!(synthesizer.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn synthesis_failure_exhausts_and_notifies_failure() {
    let mut parts = happy_parts();
    parts.synthesizer = Arc::new(StubSynthesizer::failing());
    let notifier = parts.notifier.clone();
    let workflow = parts.build();

    let err = workflow.run(Some(target())).await.unwrap_err();
    assert!(matches!(err, WorkflowError::StepExhausted { .. }));

    let messages = notifier.messages.lock().unwrap();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("failed"));
}

#[tokio::test(start_paused = true)]
async fn notification_delivery_failure_never_affects_the_outcome() -> Result<()> {
    let mut parts = happy_parts();
    parts.notifier = Arc::new(RecordingNotifier::failing());
    let workflow = parts.build();

    let ack = workflow.run(Some(target())).await?;
    assert_eq!(ack, "OK");
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn resumed_run_replays_completed_steps_without_regenerating() -> Result<()> {
    // First run fails at audio synthesis after all text steps succeeded.
    let mut parts = happy_parts();
    let step_store = parts.step_store.clone();
    let generator = parts.generator.clone();
    parts.synthesizer = Arc::new(StubSynthesizer::failing());
    let workflow = parts.build();

    let err = workflow.run(Some(target())).await.unwrap_err();
    assert!(matches!(err, WorkflowError::StepExhausted { .. }));
    let calls_after_first = generator.calls.load(Ordering::SeqCst);
    // One summary plus podcast, blog, and intro compositions.
    assert_eq!(calls_after_first, 4);

    // Second run for the same date shares the step store; only the audio
    // and persistence steps still execute.
    let mut parts = happy_parts();
    parts.step_store = step_store;
    parts.generator = generator.clone();
    let records = parts.records.clone();
    let workflow = parts.build();

    let ack = workflow.run(Some(target())).await?;
    assert_eq!(ack, "OK");
    assert_eq!(generator.calls.load(Ordering::SeqCst), calls_after_first);
    assert!(records
        .get(&content_record_key("test", target()))
        .await?
        .is_some());
    Ok(())
}

#[test]
fn storage_keys_follow_the_documented_conventions() {
    let date = target();
    assert_eq!(
        audio_object_key(date, "production"),
        "2025/03/21/production/podcast-2025-03-21.mp3"
    );
    assert_eq!(
        content_record_key("production", date),
        "content:production:podcast-rss:2025-03-21"
    );

    let window = past_days(date, 3);
    assert_eq!(
        window,
        vec![
            NaiveDate::from_ymd_opt(2025, 3, 21).unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 20).unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 19).unwrap(),
        ]
    );
}
