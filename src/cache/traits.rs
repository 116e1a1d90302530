//! Storage interface for cache entries

use async_trait::async_trait;

use super::error::StorageResult;
use super::types::{ArtifactSet, CacheEntry, CacheKey, EntryManifest};

/// Persistent home for cache entries
///
/// Implementations must publish atomically: [`CacheBackend::load`] never
/// returns an entry that is missing any of the five artifacts.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Load a complete entry, or `None` when any artifact is absent
    async fn load(&self, key: &CacheKey) -> StorageResult<Option<CacheEntry>>;

    /// Persist all artifacts under the key and return the entry as stored.
    /// When an entry already exists for the key the existing one is returned.
    async fn publish(&self, key: &CacheKey, artifacts: &ArtifactSet) -> StorageResult<CacheEntry>;

    /// Manifests of every complete entry, oldest first
    async fn list(&self) -> StorageResult<Vec<EntryManifest>>;

    /// Remove an entry by namespace; returns whether anything was removed
    async fn remove(&self, namespace: &str) -> StorageResult<bool>;
}
