use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tracing::{error, info};

use crate::error::{PipelineError, Result};

/// Object storage capability consumed by the pipeline stages.
///
/// Keys are slash-separated paths relative to the store root. `delete` is
/// idempotent: removing an absent key is a no-op, which keeps quarantine
/// cleanup safely re-runnable.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put_json(&self, payload: &Value, key: &str) -> Result<()>;

    async fn get_json(&self, key: &str) -> Result<Value>;

    async fn put_bytes(&self, data: Vec<u8>, key: &str) -> Result<()>;

    async fn get_bytes(&self, key: &str) -> Result<Vec<u8>>;

    async fn delete(&self, key: &str) -> Result<()>;
}

/// Filesystem-backed store rooted at a configured directory, the local
/// analogue of an S3 bucket.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn object_path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    fn write(&self, data: &[u8], key: &str) -> Result<()> {
        let path = self.object_path(key);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|err| storage_error(key, &err))?;
        }
        std::fs::write(&path, data).map_err(|err| storage_error(key, &err))?;
        info!("Saved object to {}", path.display());
        Ok(())
    }

    fn read(&self, key: &str) -> Result<Vec<u8>> {
        std::fs::read(self.object_path(key)).map_err(|err| {
            error!("Failed to load object at key '{key}': {err}");
            storage_error(key, &err)
        })
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put_json(&self, payload: &Value, key: &str) -> Result<()> {
        self.write(&serde_json::to_vec(payload)?, key)
    }

    async fn get_json(&self, key: &str) -> Result<Value> {
        Ok(serde_json::from_slice(&self.read(key)?)?)
    }

    async fn put_bytes(&self, data: Vec<u8>, key: &str) -> Result<()> {
        self.write(&data, key)
    }

    async fn get_bytes(&self, key: &str) -> Result<Vec<u8>> {
        self.read(key)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        match std::fs::remove_file(self.object_path(key)) {
            Ok(()) => {
                info!("Deleted object at key '{key}'");
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(storage_error(key, &err)),
        }
    }
}

fn storage_error(key: &str, err: &dyn std::fmt::Display) -> PipelineError {
    PipelineError::Storage {
        key: key.to_string(),
        message: err.to_string(),
    }
}

/// In-memory store used by tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryObjectStore {
    objects: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.lock().keys().cloned().collect();
        keys.sort();
        keys
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>> {
        self.objects
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put_json(&self, payload: &Value, key: &str) -> Result<()> {
        let data = serde_json::to_vec(payload)?;
        self.lock().insert(key.to_string(), data);
        Ok(())
    }

    async fn get_json(&self, key: &str) -> Result<Value> {
        Ok(serde_json::from_slice(&self.get_bytes(key).await?)?)
    }

    async fn put_bytes(&self, data: Vec<u8>, key: &str) -> Result<()> {
        self.lock().insert(key.to_string(), data);
        Ok(())
    }

    async fn get_bytes(&self, key: &str) -> Result<Vec<u8>> {
        self.lock()
            .get(key)
            .cloned()
            .ok_or_else(|| storage_error(key, &"object not found"))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.lock().remove(key);
        Ok(())
    }
}
