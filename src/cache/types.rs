//! Cache entry types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::params::{Fingerprint, ParameterSet};
use crate::table::DataTable;

/// The five artifacts every cache entry holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// Raw event-level table
    Events,
    /// One row per team
    TeamAggregate,
    /// Team-versus-opponent rows
    PairAggregate,
    /// One row per player of the analysed team
    PlayerAggregate,
    /// Squad list with positions and set-piece roles
    Roster,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 5] = [
        ArtifactKind::Events,
        ArtifactKind::TeamAggregate,
        ArtifactKind::PairAggregate,
        ArtifactKind::PlayerAggregate,
        ArtifactKind::Roster,
    ];

    /// File name inside an entry's namespace
    pub fn file_name(&self) -> &'static str {
        match self {
            ArtifactKind::Events => "df.csv",
            ArtifactKind::TeamAggregate => "df_team.csv",
            ArtifactKind::PairAggregate => "df_agr_pair.csv",
            ArtifactKind::PlayerAggregate => "df_jug_team.csv",
            ArtifactKind::Roster => "df_players.csv",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

/// A complete set of the five artifacts
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ArtifactSet {
    pub events: DataTable,
    pub team_aggregate: DataTable,
    pub pair_aggregate: DataTable,
    pub player_aggregate: DataTable,
    pub roster: DataTable,
}

impl ArtifactSet {
    pub fn get(&self, kind: ArtifactKind) -> &DataTable {
        match kind {
            ArtifactKind::Events => &self.events,
            ArtifactKind::TeamAggregate => &self.team_aggregate,
            ArtifactKind::PairAggregate => &self.pair_aggregate,
            ArtifactKind::PlayerAggregate => &self.player_aggregate,
            ArtifactKind::Roster => &self.roster,
        }
    }

    fn slot(&mut self, kind: ArtifactKind) -> &mut DataTable {
        match kind {
            ArtifactKind::Events => &mut self.events,
            ArtifactKind::TeamAggregate => &mut self.team_aggregate,
            ArtifactKind::PairAggregate => &mut self.pair_aggregate,
            ArtifactKind::PlayerAggregate => &mut self.player_aggregate,
            ArtifactKind::Roster => &mut self.roster,
        }
    }

    /// Build a set by producing each artifact in turn; the first failure wins
    pub fn try_build<E, F>(mut produce: F) -> Result<Self, E>
    where
        F: FnMut(ArtifactKind) -> Result<DataTable, E>,
    {
        let mut set = ArtifactSet::default();
        for kind in ArtifactKind::ALL {
            *set.slot(kind) = produce(kind)?;
        }
        Ok(set)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ArtifactKind, &DataTable)> {
        ArtifactKind::ALL.into_iter().map(move |kind| (kind, self.get(kind)))
    }
}

/// Address of a cache entry
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub fingerprint: Fingerprint,
    pub namespace: String,
    pub canonical: String,
}

impl From<&ParameterSet> for CacheKey {
    fn from(params: &ParameterSet) -> Self {
        Self {
            fingerprint: params.fingerprint(),
            namespace: params.namespace(),
            canonical: params.canonical(),
        }
    }
}

/// Metadata stored next to an entry's artifacts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryManifest {
    pub fingerprint: Fingerprint,
    pub namespace: String,
    pub parameters: String,
    pub created_at: DateTime<Utc>,
}

impl EntryManifest {
    pub fn new(key: &CacheKey) -> Self {
        Self {
            fingerprint: key.fingerprint.clone(),
            namespace: key.namespace.clone(),
            parameters: key.canonical.clone(),
            created_at: Utc::now(),
        }
    }
}

/// A published, immutable cache entry
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub manifest: EntryManifest,
    pub artifacts: Arc<ArtifactSet>,
}

impl CacheEntry {
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.manifest.fingerprint
    }

    pub fn namespace(&self) -> &str {
        &self.manifest.namespace
    }

    pub fn artifact(&self, kind: ArtifactKind) -> &DataTable {
        self.artifacts.get(kind)
    }
}
