//! Durable JSON blob storage for precomputed snapshots.

use crate::config::Config;
use crate::error::{PoolError, PoolResult};
use crate::models::{UserId, WeekId};
use async_trait::async_trait;
use log::debug;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn write(&self, bucket: &str, key: &str, json: String) -> PoolResult<()>;
    /// `Ok(None)` when the key does not exist.
    async fn read(&self, bucket: &str, key: &str) -> PoolResult<Option<String>>;
}

pub fn reveal_snapshot_key(week_id: WeekId) -> String {
    format!("snapshots/week-{week_id}-reveal-snapshot.json")
}

pub fn season_matrix_key(season_year: i32) -> String {
    format!("snapshots/season-{season_year}-matrix.json")
}

pub fn user_entries_key(user_id: UserId) -> String {
    format!("snapshots/user-{user_id}-entries-with-picks.json")
}

/// Blob store bound to the configured bucket and key prefix.
#[derive(Clone)]
pub struct SnapshotPublisher {
    blobs: Arc<dyn BlobStore>,
    bucket: Option<String>,
    prefix: String,
}

impl SnapshotPublisher {
    pub fn new(blobs: Arc<dyn BlobStore>, config: &Config) -> Self {
        Self {
            blobs,
            bucket: config.bucket.clone(),
            prefix: config.bucket_prefix.clone(),
        }
    }

    fn bucket(&self) -> PoolResult<&str> {
        self.bucket
            .as_deref()
            .ok_or(PoolError::ConfigurationMissing("SURVIVOR_BUCKET"))
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{key}", self.prefix)
    }

    /// Serialize `payload` and write it under `key`; returns the full key written.
    pub async fn publish<T: Serialize + Sync>(&self, key: &str, payload: &T) -> PoolResult<String> {
        let bucket = self.bucket()?;
        let full_key = self.full_key(key);
        let json = serde_json::to_string(payload)?;
        debug!("writing {} bytes to {bucket}/{full_key}", json.len());
        self.blobs.write(bucket, &full_key, json).await?;
        Ok(full_key)
    }

    pub async fn load<T: DeserializeOwned>(&self, key: &str) -> PoolResult<Option<T>> {
        let bucket = self.bucket()?;
        match self.blobs.read(bucket, &self.full_key(key)).await? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<(String, String), String>>,
}

impl MemoryBlobStore {
    pub async fn keys(&self, bucket: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .blobs
            .lock()
            .await
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, k)| k.clone())
            .collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn write(&self, bucket: &str, key: &str, json: String) -> PoolResult<()> {
        self.blobs
            .lock()
            .await
            .insert((bucket.to_owned(), key.to_owned()), json);
        Ok(())
    }

    async fn read(&self, bucket: &str, key: &str) -> PoolResult<Option<String>> {
        Ok(self
            .blobs
            .lock()
            .await
            .get(&(bucket.to_owned(), key.to_owned()))
            .cloned())
    }
}

/// Blobs as files under `<root>/<bucket>/<key>`.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, bucket: &str, key: &str) -> PoolResult<PathBuf> {
        let relative = Path::new(bucket).join(key);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(PoolError::BlobFailed(format!("invalid blob path {bucket}/{key}")));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn write(&self, bucket: &str, key: &str, json: String) -> PoolResult<()> {
        let path = self.path_for(bucket, key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| PoolError::BlobFailed(format!("{}: {e}", parent.display())))?;
        }
        tokio::fs::write(&path, json)
            .await
            .map_err(|e| PoolError::BlobFailed(format!("{}: {e}", path.display())))
    }

    async fn read(&self, bucket: &str, key: &str) -> PoolResult<Option<String>> {
        let path = self.path_for(bucket, key)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(json) => Ok(Some(json)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(PoolError::BlobFailed(format!("{}: {e}", path.display()))),
        }
    }
}
