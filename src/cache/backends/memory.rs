//! In-memory cache backend for tests and embedding

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::cache::{
    error::StorageResult,
    traits::CacheBackend,
    types::{ArtifactSet, CacheEntry, CacheKey, EntryManifest},
};

/// Cache backend holding entries in a process-local map
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    async fn load(&self, key: &CacheKey) -> StorageResult<Option<CacheEntry>> {
        Ok(self.entries.read().await.get(&key.namespace).cloned())
    }

    async fn publish(&self, key: &CacheKey, artifacts: &ArtifactSet) -> StorageResult<CacheEntry> {
        let mut entries = self.entries.write().await;
        let entry = entries
            .entry(key.namespace.clone())
            .or_insert_with(|| CacheEntry {
                manifest: EntryManifest::new(key),
                artifacts: Arc::new(artifacts.clone()),
            });
        Ok(entry.clone())
    }

    async fn list(&self) -> StorageResult<Vec<EntryManifest>> {
        let mut manifests: Vec<EntryManifest> = self
            .entries
            .read()
            .await
            .values()
            .map(|e| e.manifest.clone())
            .collect();
        manifests.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(manifests)
    }

    async fn remove(&self, namespace: &str) -> StorageResult<bool> {
        Ok(self.entries.write().await.remove(namespace).is_some())
    }
}
