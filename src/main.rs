use anyhow::Context;
use chrono::NaiveDate;
use clap::Parser;
use rss_podcast::{
    ContentPipeline, FeedAggregator, FsObjectStore, FsRecordStore, HttpFeedFetcher,
    HttpSynthesizer, MemoryStepStore, OpenAiGenerator, StepExecutor, SystemClock, WebhookNotifier,
    Workflow, WorkflowConfig,
};
use std::sync::Arc;
use tracing::info;

/// Generate the daily RSS podcast bundle for one target date.
#[derive(Parser, Debug)]
#[command(name = "rss-podcast", version)]
struct Args {
    /// Target calendar day (YYYY-MM-DD); defaults to today.
    #[arg(long)]
    date: Option<NaiveDate>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let config = WorkflowConfig::from_env().context("Failed to load configuration")?;

    info!(
        feeds = config.feed_urls.len(),
        environment = %config.environment,
        "starting daily podcast workflow"
    );

    let executor = StepExecutor::new(Arc::new(MemoryStepStore::new()));
    let aggregator = FeedAggregator::new(Arc::new(HttpFeedFetcher::default()));
    let generator = Arc::new(OpenAiGenerator::new(
        config.openai_base_url.clone(),
        config.openai_api_key.clone(),
        config.openai_model.clone(),
    ));
    let pipeline = ContentPipeline::new(
        generator,
        executor.clone(),
        config.retry.clone(),
        config.max_articles,
        config.cooldown,
        config.openai_max_tokens,
    );
    let synthesizer = Arc::new(HttpSynthesizer::new(
        config.tts_endpoint.clone(),
        config.voice_id.clone(),
        config.speech_rate.clone(),
    ));
    let objects = Arc::new(FsObjectStore::new(config.data_dir.clone()));
    let records = Arc::new(FsRecordStore::new(config.data_dir.clone()));
    let notifier = Arc::new(WebhookNotifier::new(config.webhook_url.clone()));

    let workflow = Workflow::new(
        config,
        Arc::new(SystemClock),
        executor,
        aggregator,
        pipeline,
        synthesizer,
        objects,
        records,
        notifier,
    );

    let ack = workflow.run(args.date).await?;
    info!(ack, "workflow finished");
    Ok(())
}
