//! File-based cache backend
//!
//! Layout under the root directory:
//!
//! ```text
//! <root>/<namespace>/df.csv
//! <root>/<namespace>/df_team.csv
//! <root>/<namespace>/df_agr_pair.csv
//! <root>/<namespace>/df_jug_team.csv
//! <root>/<namespace>/df_players.csv
//! <root>/<namespace>/manifest.json
//! <root>/.staging-<uuid>/...            (in-flight publishes)
//! ```
//!
//! Entries are written into a staging directory and renamed into place, so a
//! half-written entry is never visible under its namespace.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::cache::{
    error::{StorageError, StorageResult},
    traits::CacheBackend,
    types::{ArtifactKind, ArtifactSet, CacheEntry, CacheKey, EntryManifest},
};
use crate::table::{read_csv, write_csv, DataTable};

const MANIFEST_FILE: &str = "manifest.json";
const STAGING_PREFIX: &str = ".staging-";

/// Cache backend storing each entry as a directory of CSV files
#[derive(Debug, Clone)]
pub struct FileBackend {
    root: PathBuf,
}

impl FileBackend {
    /// Create a backend rooted at `root`, creating the directory if needed
    pub async fn new(root: impl Into<PathBuf>) -> StorageResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_dir(&self, namespace: &str) -> PathBuf {
        self.root.join(namespace)
    }

    /// Entry directory for a caller-supplied namespace
    ///
    /// Only a single plain path component is accepted, and staging
    /// directories are not entries.
    fn checked_entry_dir(&self, namespace: &str) -> StorageResult<PathBuf> {
        let mut components = Path::new(namespace).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(name)), None)
                if name.to_str() == Some(namespace) && !namespace.starts_with(STAGING_PREFIX) =>
            {
                Ok(self.entry_dir(namespace))
            }
            _ => Err(StorageError::InvalidNamespace(namespace.to_string())),
        }
    }

    async fn read_table(path: &Path) -> StorageResult<DataTable> {
        let bytes = fs::read(path).await?;
        Ok(read_csv(bytes.as_slice())?)
    }

    async fn write_table(path: &Path, table: &DataTable) -> StorageResult<()> {
        let mut buf = Vec::new();
        write_csv(table, &mut buf)?;
        fs::write(path, buf).await?;
        Ok(())
    }

    /// Whether every artifact file exists in `dir`
    async fn is_complete(dir: &Path) -> bool {
        for kind in ArtifactKind::ALL {
            match fs::metadata(dir.join(kind.file_name())).await {
                Ok(meta) if meta.is_file() => {}
                _ => return false,
            }
        }
        true
    }

    async fn read_manifest(dir: &Path, key: Option<&CacheKey>) -> StorageResult<EntryManifest> {
        let path = dir.join(MANIFEST_FILE);
        match fs::read_to_string(&path).await {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Entries written by other tools may lack a manifest
                let key = key.ok_or_else(|| StorageError::not_found(path.display()))?;
                let modified = fs::metadata(dir).await?.modified()?;
                let mut manifest = EntryManifest::new(key);
                manifest.created_at = DateTime::<Utc>::from(modified);
                Ok(manifest)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn read_entry(dir: &Path, key: Option<&CacheKey>) -> StorageResult<CacheEntry> {
        let manifest = Self::read_manifest(dir, key).await?;
        let mut tables = Vec::with_capacity(ArtifactKind::ALL.len());
        for kind in ArtifactKind::ALL {
            tables.push(Self::read_table(&dir.join(kind.file_name())).await?);
        }
        let mut tables = tables.into_iter();
        let artifacts = ArtifactSet::try_build(|kind| {
            tables
                .next()
                .ok_or_else(|| StorageError::corrupted(format!("missing {}", kind)))
        })?;
        Ok(CacheEntry {
            manifest,
            artifacts: Arc::new(artifacts),
        })
    }

    async fn write_staging(
        staging: &Path,
        key: &CacheKey,
        artifacts: &ArtifactSet,
    ) -> StorageResult<()> {
        fs::create_dir_all(staging).await?;
        for (kind, table) in artifacts.iter() {
            Self::write_table(&staging.join(kind.file_name()), table).await?;
        }
        let manifest = serde_json::to_string_pretty(&EntryManifest::new(key))?;
        fs::write(staging.join(MANIFEST_FILE), manifest).await?;
        Ok(())
    }

    /// Remove staging directories left behind by interrupted publishes
    pub async fn sweep_staging(&self) -> StorageResult<usize> {
        let mut removed = 0;
        let mut entries = fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            if name.to_string_lossy().starts_with(STAGING_PREFIX)
                && fs::remove_dir_all(entry.path()).await.is_ok()
            {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

#[async_trait]
impl CacheBackend for FileBackend {
    async fn load(&self, key: &CacheKey) -> StorageResult<Option<CacheEntry>> {
        let dir = self.entry_dir(&key.namespace);
        if !Self::is_complete(&dir).await {
            return Ok(None);
        }
        Self::read_entry(&dir, Some(key)).await.map(Some)
    }

    async fn publish(&self, key: &CacheKey, artifacts: &ArtifactSet) -> StorageResult<CacheEntry> {
        let target = self.entry_dir(&key.namespace);
        let staging = self
            .root
            .join(format!("{}{}", STAGING_PREFIX, Uuid::new_v4()));

        if let Err(e) = Self::write_staging(&staging, key, artifacts).await {
            let _ = fs::remove_dir_all(&staging).await;
            return Err(e);
        }

        if Self::is_complete(&target).await {
            debug!("Entry {} already published, discarding staged copy", key.namespace);
            let _ = fs::remove_dir_all(&staging).await;
        } else {
            if fs::metadata(&target).await.is_ok() {
                // An incomplete directory under the namespace is never a hit
                warn!("Replacing incomplete cache entry at {}", target.display());
                fs::remove_dir_all(&target).await?;
            }
            if let Err(e) = fs::rename(&staging, &target).await {
                let _ = fs::remove_dir_all(&staging).await;
                if !Self::is_complete(&target).await {
                    return Err(StorageError::publish(&target, e));
                }
            }
        }

        Self::read_entry(&target, Some(key)).await
    }

    async fn list(&self) -> StorageResult<Vec<EntryManifest>> {
        let mut manifests = Vec::new();
        let mut entries = fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let name = entry.file_name();
            if name.to_string_lossy().starts_with(STAGING_PREFIX)
                || !entry.file_type().await?.is_dir()
            {
                continue;
            }
            if !Self::is_complete(&path).await {
                continue;
            }
            match Self::read_manifest(&path, None).await {
                Ok(manifest) => manifests.push(manifest),
                Err(e) => warn!("Skipping cache entry {}: {}", path.display(), e),
            }
        }
        manifests.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(manifests)
    }

    async fn remove(&self, namespace: &str) -> StorageResult<bool> {
        let dir = self.checked_entry_dir(namespace)?;
        match fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
