use crate::types::{Result, WorkflowError};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::RwLock;
use tracing::debug;

/// Blob storage for audio payloads.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<()>;
    /// Size of the stored object, or `None` when the key is absent.
    async fn head(&self, key: &str) -> Result<Option<u64>>;
}

/// Key-value storage for content bundle records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn put(&self, key: &str, value: serde_json::Value) -> Result<()>;
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>>;
}

/// Object key for the narrated audio of one run:
/// `<year>/<month>/<day>/<environment>/podcast-<date>.mp3`.
pub fn audio_object_key(date: NaiveDate, environment: &str) -> String {
    format!(
        "{}/{}/podcast-{}.mp3",
        date.format("%Y/%m/%d"),
        environment,
        date
    )
}

/// Record key of the content bundle for one run, namespaced by environment.
pub fn content_record_key(environment: &str, date: NaiveDate) -> String {
    format!("content:{}:podcast-rss:{}", environment, date)
}

/// The calendar days inside the retention window, newest first. The external
/// syndication renderer reads one bundle per returned day.
pub fn past_days(today: NaiveDate, keep_days: u32) -> Vec<NaiveDate> {
    (0..keep_days as i64)
        .map(|offset| today - chrono::Duration::days(offset))
        .collect()
}

#[derive(Default)]
pub struct MemoryObjectStore {
    objects: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        self.objects.write().await.insert(key.to_string(), bytes);
        Ok(())
    }

    async fn head(&self, key: &str) -> Result<Option<u64>> {
        Ok(self
            .objects
            .read()
            .await
            .get(key)
            .map(|b| b.len() as u64))
    }
}

#[derive(Default)]
pub struct MemoryRecordStore {
    records: RwLock<HashMap<String, serde_json::Value>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn put(&self, key: &str, value: serde_json::Value) -> Result<()> {
        self.records.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>> {
        Ok(self.records.read().await.get(key).cloned())
    }
}

/// Filesystem-backed object store rooted at a data directory. Slashes in
/// object keys become subdirectories.
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join("objects").join(key)
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| WorkflowError::Storage(e.to_string()))?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| WorkflowError::Storage(e.to_string()))?;
        debug!(key, path = %path.display(), "object written");
        Ok(())
    }

    async fn head(&self, key: &str) -> Result<Option<u64>> {
        match tokio::fs::metadata(self.path_for(key)).await {
            Ok(meta) => Ok(Some(meta.len())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(WorkflowError::Storage(e.to_string())),
        }
    }
}

/// Filesystem-backed record store; one JSON file per record key.
pub struct FsRecordStore {
    root: PathBuf,
}

impl FsRecordStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join("records").join(format!("{}.json", key))
    }
}

#[async_trait]
impl RecordStore for FsRecordStore {
    async fn put(&self, key: &str, value: serde_json::Value) -> Result<()> {
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| WorkflowError::Storage(e.to_string()))?;
        }
        let body = serde_json::to_vec_pretty(&value)?;
        tokio::fs::write(&path, body)
            .await
            .map_err(|e| WorkflowError::Storage(e.to_string()))?;
        debug!(key, path = %path.display(), "record written");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>> {
        match tokio::fs::read(self.path_for(key)).await {
            Ok(body) => Ok(Some(serde_json::from_slice(&body)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(WorkflowError::Storage(e.to_string())),
        }
    }
}
