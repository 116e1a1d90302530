//! Dataset cache behaviour against the on-disk backend

mod common;

use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use common::{params, CountingSource};
use matchdoc::cache::{ArtifactCache, ArtifactKind, EvictionPolicy, FileBackend};

async fn cache(root: &TempDir, source: Arc<CountingSource>) -> ArtifactCache {
    let backend = FileBackend::new(root.path().to_path_buf()).await.unwrap();
    ArtifactCache::new(Arc::new(backend), source)
}

#[tokio::test]
async fn test_entry_survives_a_new_cache_instance() {
    let root = TempDir::new().unwrap();
    let source = Arc::new(CountingSource::new());

    let first = cache(&root, source.clone()).await.resolve(&params(10)).await.unwrap();
    let second = cache(&root, source.clone()).await.resolve(&params(10)).await.unwrap();

    assert_eq!(source.calls(), 1);
    assert_eq!(first.fingerprint(), second.fingerprint());
    assert_eq!(
        first.artifact(ArtifactKind::TeamAggregate),
        second.artifact(ArtifactKind::TeamAggregate)
    );
}

#[tokio::test]
async fn test_concurrent_resolves_compute_once() {
    let root = TempDir::new().unwrap();
    let source = Arc::new(CountingSource::with_delay(Duration::from_millis(50)));
    let cache = Arc::new(cache(&root, source.clone()).await);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move { cache.resolve(&params(10)).await.unwrap() })
        })
        .collect();
    let entries = futures::future::join_all(handles).await;

    assert_eq!(source.calls(), 1);
    let namespaces: Vec<String> = entries
        .into_iter()
        .map(|entry| entry.unwrap().namespace().to_string())
        .collect();
    assert!(namespaces.windows(2).all(|w| w[0] == w[1]));
}

#[tokio::test]
async fn test_different_parameters_get_separate_entries() {
    let root = TempDir::new().unwrap();
    let source = Arc::new(CountingSource::new());
    let cache = cache(&root, source.clone()).await;

    let ten = cache.resolve(&params(10)).await.unwrap();
    let five = cache.resolve(&params(5)).await.unwrap();

    assert_eq!(source.calls(), 2);
    assert_ne!(ten.namespace(), five.namespace());
    assert_eq!(cache.list().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_max_entries_prunes_oldest() {
    let root = TempDir::new().unwrap();
    let source = Arc::new(CountingSource::new());
    let cache = cache(&root, source.clone())
        .await
        .with_eviction(EvictionPolicy::MaxEntries { max_entries: 1 });

    cache.resolve(&params(10)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    let newest = cache.resolve(&params(5)).await.unwrap();

    let remaining = cache.list().await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].namespace, newest.namespace());
}
