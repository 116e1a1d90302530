//! Content-addressed cache of computed datasets
//!
//! [`ArtifactCache::resolve`] maps a [`ParameterSet`] to its [`CacheEntry`],
//! computing the five artifacts through a [`DatasetSource`] only when the
//! backend does not already hold a complete entry for the fingerprint.
//!
//! Resolves for the same fingerprint are serialized inside the process, so a
//! burst of identical requests triggers a single computation.

pub mod backends;
pub mod error;
pub mod eviction;
pub mod source;
pub mod traits;
pub mod types;

pub use backends::{FileBackend, MemoryBackend};
pub use error::{StorageError, StorageResult};
pub use eviction::EvictionPolicy;
pub use source::{CommandSource, DatasetSource, DirectorySource, SourceError};
pub use traits::CacheBackend;
pub use types::{ArtifactKind, ArtifactSet, CacheEntry, CacheKey, EntryManifest};

use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{ErrorCode, ReportError, Result};
use crate::params::{Fingerprint, ParameterSet};
use crate::retry::{RetryError, RetryExecutor, RetryPolicy};

/// Resolves parameter sets to cache entries
pub struct ArtifactCache {
    backend: Arc<dyn CacheBackend>,
    source: Arc<dyn DatasetSource>,
    eviction: EvictionPolicy,
    retry: RetryExecutor,
    inflight: Mutex<HashMap<Fingerprint, Arc<Mutex<()>>>>,
}

impl ArtifactCache {
    pub fn new(backend: Arc<dyn CacheBackend>, source: Arc<dyn DatasetSource>) -> Self {
        Self {
            backend,
            source,
            eviction: EvictionPolicy::default(),
            retry: RetryExecutor::new(RetryPolicy::no_retry()),
            inflight: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_eviction(mut self, eviction: EvictionPolicy) -> Self {
        self.eviction = eviction;
        self
    }

    /// Retry policy for the data-source call
    pub fn with_source_retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = RetryExecutor::new(policy);
        self
    }

    pub fn eviction(&self) -> &EvictionPolicy {
        &self.eviction
    }

    /// Return the entry for `params`, computing and publishing it on a miss
    pub async fn resolve(&self, params: &ParameterSet) -> Result<CacheEntry> {
        let key = CacheKey::from(params);

        if let Some(entry) = self.load_fresh(&key).await? {
            debug!("Cache hit for {}", key.namespace);
            return Ok(entry);
        }

        let lock = self.flight_lock(&key.fingerprint).await;
        let _guard = lock.lock().await;

        // Another resolve may have published while we waited
        if let Some(entry) = self.load_fresh(&key).await? {
            debug!("Cache hit for {} after waiting on in-flight build", key.namespace);
            self.release_flight(&key.fingerprint, &lock).await;
            return Ok(entry);
        }

        let result = self.build(&key, params).await;
        self.release_flight(&key.fingerprint, &lock).await;
        result
    }

    async fn build(&self, key: &CacheKey, params: &ParameterSet) -> Result<CacheEntry> {
        info!("Cache miss for {}, computing datasets", key.namespace);

        let artifacts = self
            .retry
            .execute_with_retry("dataset computation", || self.source.compute(params))
            .await
            .map_err(|e| match e {
                RetryError::Exhausted { attempts, last } => ReportError::data_source(
                    ErrorCode::DATA_SOURCE_UNAVAILABLE,
                    format!("{} (after {} attempts)", last, attempts),
                ),
                RetryError::Fatal(err) => {
                    let code = match err {
                        SourceError::MissingArtifact { .. } => {
                            ErrorCode::DATA_SOURCE_MISSING_ARTIFACT
                        }
                        SourceError::Unavailable(_) => ErrorCode::DATA_SOURCE_UNAVAILABLE,
                        _ => ErrorCode::DATA_SOURCE_FAILED,
                    };
                    ReportError::data_source(code, err.to_string())
                }
            })?;

        let entry = self.backend.publish(key, &artifacts).await?;
        debug!("Published cache entry {}", entry.namespace());

        self.enforce_capacity().await;
        Ok(entry)
    }

    async fn load_fresh(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        let Some(entry) = self.backend.load(key).await? else {
            return Ok(None);
        };
        if self.eviction.is_fresh(entry.manifest.created_at, Utc::now()) {
            return Ok(Some(entry));
        }
        info!("Cache entry {} expired, evicting", key.namespace);
        self.backend.remove(&key.namespace).await?;
        Ok(None)
    }

    async fn flight_lock(&self, fingerprint: &Fingerprint) -> Arc<Mutex<()>> {
        let mut inflight = self.inflight.lock().await;
        inflight
            .entry(fingerprint.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn release_flight(&self, fingerprint: &Fingerprint, lock: &Arc<Mutex<()>>) {
        let mut inflight = self.inflight.lock().await;
        // The map and our local clone are the only holders when nobody else waits
        if Arc::strong_count(lock) <= 2 {
            inflight.remove(fingerprint);
        }
    }

    async fn enforce_capacity(&self) {
        if !matches!(self.eviction, EvictionPolicy::MaxEntries { .. }) {
            return;
        }
        if let Err(e) = self.prune().await {
            warn!("Cache eviction failed: {}", e);
        }
    }

    /// Manifests of every stored entry, oldest first
    pub async fn list(&self) -> Result<Vec<EntryManifest>> {
        Ok(self.backend.list().await?)
    }

    /// Remove every entry the eviction policy no longer admits
    pub async fn prune(&self) -> Result<Vec<String>> {
        let manifests = self.backend.list().await?;
        let victims = self.eviction.select_victims(&manifests, Utc::now());
        let mut removed = Vec::with_capacity(victims.len());
        for namespace in victims {
            if self.backend.remove(&namespace).await? {
                debug!("Evicted cache entry {}", namespace);
                removed.push(namespace);
            }
        }
        Ok(removed)
    }

    /// Remove one entry by namespace
    pub async fn remove(&self, namespace: &str) -> Result<bool> {
        Ok(self.backend.remove(namespace).await?)
    }
}
