//! Eviction policy for cache entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::types::EntryManifest;

/// When cache entries stop being served
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EvictionPolicy {
    /// Entries live forever
    #[default]
    Unbounded,
    /// Keep at most `max_entries`, removing the oldest after each publish
    MaxEntries { max_entries: usize },
    /// Entries older than `ttl` are treated as misses and removed
    Ttl {
        #[serde(with = "humantime_serde")]
        ttl: Duration,
    },
}

impl EvictionPolicy {
    /// Whether an entry created at `created_at` is still valid at `now`
    pub fn is_fresh(&self, created_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        match self {
            EvictionPolicy::Ttl { ttl } => {
                let age = now.signed_duration_since(created_at);
                match chrono::Duration::from_std(*ttl) {
                    Ok(ttl) => age <= ttl,
                    Err(_) => true,
                }
            }
            _ => true,
        }
    }

    /// Namespaces to evict, given manifests sorted oldest first
    pub fn select_victims(&self, entries: &[EntryManifest], now: DateTime<Utc>) -> Vec<String> {
        match self {
            EvictionPolicy::Unbounded => Vec::new(),
            EvictionPolicy::MaxEntries { max_entries } => {
                let excess = entries.len().saturating_sub(*max_entries);
                entries
                    .iter()
                    .take(excess)
                    .map(|m| m.namespace.clone())
                    .collect()
            }
            EvictionPolicy::Ttl { .. } => entries
                .iter()
                .filter(|m| !self.is_fresh(m.created_at, now))
                .map(|m| m.namespace.clone())
                .collect(),
        }
    }
}
