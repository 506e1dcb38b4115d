use crate::types::{Result, RetryPolicy, StepRecord, StepStatus, WorkflowError};
use async_trait::async_trait;
use backoff::backoff::Backoff;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Durable store for memoized step outcomes.
#[async_trait]
pub trait StepStore: Send + Sync {
    async fn get(&self, run_key: &str, step_name: &str) -> Result<Option<StepRecord>>;
    async fn put(&self, record: StepRecord) -> Result<()>;
}

/// In-process step store for tests and single-process runs.
#[derive(Default)]
pub struct MemoryStepStore {
    records: RwLock<HashMap<(String, String), StepRecord>>,
}

impl MemoryStepStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StepStore for MemoryStepStore {
    async fn get(&self, run_key: &str, step_name: &str) -> Result<Option<StepRecord>> {
        let records = self.records.read().await;
        Ok(records
            .get(&(run_key.to_string(), step_name.to_string()))
            .cloned())
    }

    async fn put(&self, record: StepRecord) -> Result<()> {
        let mut records = self.records.write().await;
        records.insert((record.run_key.clone(), record.step_name.clone()), record);
        Ok(())
    }
}

/// Runs one named unit of work with bounded retries, backoff, a per-attempt
/// timeout, and memoization keyed by `(run_key, step_name)`.
#[derive(Clone)]
pub struct StepExecutor {
    store: Arc<dyn StepStore>,
}

impl StepExecutor {
    pub fn new(store: Arc<dyn StepStore>) -> Self {
        Self { store }
    }

    /// Execute `action` under `policy`. A step already marked succeeded for
    /// this run returns its stored result without invoking `action` again.
    pub async fn execute<T, F, Fut>(
        &self,
        run_key: &str,
        step_name: &str,
        policy: &RetryPolicy,
        mut action: F,
    ) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<T>> + Send,
    {
        if let Some(record) = self.store.get(run_key, step_name).await? {
            if record.status == StepStatus::Succeeded {
                if let Some(result) = record.result {
                    debug!(step = step_name, "step already succeeded, replaying stored result");
                    return Ok(serde_json::from_value(result)?);
                }
            }
        }

        let mut delays = policy.delays();
        let mut last_error: Option<WorkflowError> = None;

        for attempt in 0..=policy.retry_limit {
            if attempt > 0 {
                let delay = delays.next_backoff().unwrap_or(policy.initial_delay);
                debug!(
                    step = step_name,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "backing off before retry"
                );
                tokio::time::sleep(delay).await;
            }

            let outcome = match tokio::time::timeout(policy.timeout, action()).await {
                Ok(result) => result,
                Err(_) => Err(WorkflowError::Timeout {
                    step: step_name.to_string(),
                }),
            };

            match outcome {
                Ok(value) => {
                    info!(step = step_name, attempt, outcome = "succeeded", "step attempt");
                    let record =
                        StepRecord::succeeded(run_key, step_name, serde_json::to_value(&value)?);
                    // The record must be stored before the value is returned
                    // so a resumed run never repeats a completed step.
                    self.store.put(record).await?;
                    return Ok(value);
                }
                Err(err) => {
                    warn!(step = step_name, attempt, outcome = "failed", error = %err, "step attempt");
                    last_error = Some(err);
                }
            }
        }

        let last_error = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "unknown error".to_string());
        self.store
            .put(StepRecord::failed(run_key, step_name, last_error.clone()))
            .await?;
        Err(WorkflowError::StepExhausted {
            step: step_name.to_string(),
            attempts: policy.retry_limit + 1,
            last_error,
        })
    }
}
