pub mod aggregator;
pub mod clock;
pub mod config;
pub mod executor;
pub mod llm;
pub mod notify;
pub mod pipeline;
pub mod prompts;
pub mod storage;
pub mod tts;
pub mod types;
pub mod workflow;

pub use aggregator::{extract_articles, FeedAggregator, FeedFetch, HttpFeedFetcher};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::WorkflowConfig;
pub use executor::{MemoryStepStore, StepExecutor, StepStore};
pub use llm::{MockTextGenerator, OpenAiGenerator, TextGenerator};
pub use notify::{Notifier, WebhookNotifier};
pub use pipeline::ContentPipeline;
pub use storage::{
    audio_object_key, content_record_key, past_days, FsObjectStore, FsRecordStore,
    MemoryObjectStore, MemoryRecordStore, ObjectStore, RecordStore,
};
pub use tts::{HttpSynthesizer, SpeechSynthesizer};
pub use types::*;
pub use workflow::{RunState, Workflow};
