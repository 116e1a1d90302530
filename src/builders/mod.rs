//! Named, pure transforms from cached artifacts to derived tables
//!
//! Each [`BuilderName`] reads one artifact of a cache entry and produces the
//! table a page pours into its template. The fill mode each builder's output
//! expects is part of the registry, so pages never choose it themselves.

pub mod fixtures;
pub mod players;
pub mod rankings;
pub mod summaries;
pub mod team;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::cache::{ArtifactKind, ArtifactSet};
use crate::reconcile::FillMode;
use crate::table::DataTable;

/// Which flank set-piece metrics are read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Side {
    Left,
    #[default]
    Right,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
        }
    }
}

impl From<String> for Side {
    /// Anything other than `left` reads as the default right side
    fn from(value: String) -> Self {
        if value.trim().eq_ignore_ascii_case("left") {
            Side::Left
        } else {
            Side::Right
        }
    }
}

impl From<Side> for String {
    fn from(side: Side) -> Self {
        side.as_str().to_string()
    }
}

/// Options a table entry passes to its builder
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildOptions {
    /// Read the opponents' numbers instead of the team's own
    pub defensive: bool,
    pub side: Side,
    /// Name of the analysed opponent
    pub rival: String,
}

/// The closed set of table builders
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BuilderName {
    SetPieces,
    Corners,
    DirectFreeKicks,
    IndirectFreeKicks,
    ThrowIns,
    CornerSummary,
    IndirectFreeKickSummary,
    ThrowInSummary,
    CornerTakers,
    IndirectFreeKickTakers,
    ThrowInTakers,
    CornerContacts,
    IndirectFreeKickContacts,
    ThrowInContacts,
    PlayersOverview,
    TeamStatsDetailed,
    /// A name this build does not know; its table is the raw team aggregate
    Unknown(String),
}

impl BuilderName {
    pub const KNOWN: [BuilderName; 16] = [
        BuilderName::SetPieces,
        BuilderName::Corners,
        BuilderName::DirectFreeKicks,
        BuilderName::IndirectFreeKicks,
        BuilderName::ThrowIns,
        BuilderName::CornerSummary,
        BuilderName::IndirectFreeKickSummary,
        BuilderName::ThrowInSummary,
        BuilderName::CornerTakers,
        BuilderName::IndirectFreeKickTakers,
        BuilderName::ThrowInTakers,
        BuilderName::CornerContacts,
        BuilderName::IndirectFreeKickContacts,
        BuilderName::ThrowInContacts,
        BuilderName::PlayersOverview,
        BuilderName::TeamStatsDetailed,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            BuilderName::SetPieces => "set_pieces",
            BuilderName::Corners => "corners",
            BuilderName::DirectFreeKicks => "direct_free_kicks",
            BuilderName::IndirectFreeKicks => "indirect_free_kicks",
            BuilderName::ThrowIns => "throw_ins",
            BuilderName::CornerSummary => "corner_summary",
            BuilderName::IndirectFreeKickSummary => "indirect_free_kick_summary",
            BuilderName::ThrowInSummary => "throw_in_summary",
            BuilderName::CornerTakers => "corner_takers",
            BuilderName::IndirectFreeKickTakers => "indirect_free_kick_takers",
            BuilderName::ThrowInTakers => "throw_in_takers",
            BuilderName::CornerContacts => "corner_contacts",
            BuilderName::IndirectFreeKickContacts => "indirect_free_kick_contacts",
            BuilderName::ThrowInContacts => "throw_in_contacts",
            BuilderName::PlayersOverview => "players_overview",
            BuilderName::TeamStatsDetailed => "team_stats_detailed",
            BuilderName::Unknown(name) => name,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, BuilderName::Unknown(_))
    }

    /// The artifact this builder reads
    pub fn input_artifact(&self, options: &BuildOptions) -> ArtifactKind {
        match self {
            BuilderName::CornerSummary
            | BuilderName::IndirectFreeKickSummary
            | BuilderName::ThrowInSummary => {
                if options.defensive {
                    ArtifactKind::PairAggregate
                } else {
                    ArtifactKind::PlayerAggregate
                }
            }
            BuilderName::CornerTakers
            | BuilderName::IndirectFreeKickTakers
            | BuilderName::ThrowInTakers
            | BuilderName::CornerContacts
            | BuilderName::IndirectFreeKickContacts
            | BuilderName::ThrowInContacts => ArtifactKind::PlayerAggregate,
            BuilderName::PlayersOverview => ArtifactKind::Roster,
            BuilderName::TeamStatsDetailed => ArtifactKind::Events,
            _ => ArtifactKind::TeamAggregate,
        }
    }

    /// How the output is poured into a template table
    pub fn fill_mode(&self) -> FillMode {
        match self {
            BuilderName::CornerSummary
            | BuilderName::IndirectFreeKickSummary
            | BuilderName::ThrowInSummary => FillMode::HeaderRemap,
            BuilderName::CornerTakers
            | BuilderName::IndirectFreeKickTakers
            | BuilderName::ThrowInTakers
            | BuilderName::CornerContacts
            | BuilderName::IndirectFreeKickContacts
            | BuilderName::ThrowInContacts => FillMode::Totals,
            _ => FillMode::Direct,
        }
    }
}

impl FromStr for BuilderName {
    type Err = std::convert::Infallible;

    /// Config names, plus the short names older page configurations used
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        let builder = match name {
            "set_pieces" | "mk_set_pieces" => BuilderName::SetPieces,
            "corners" | "mk_corners" => BuilderName::Corners,
            "direct_free_kicks" | "mk_dfk" => BuilderName::DirectFreeKicks,
            "indirect_free_kicks" | "mk_ifk" => BuilderName::IndirectFreeKicks,
            "throw_ins" | "mk_throwins" => BuilderName::ThrowIns,
            "corner_summary" | "_summ_corners" => BuilderName::CornerSummary,
            "indirect_free_kick_summary" | "_summ_ifks" => BuilderName::IndirectFreeKickSummary,
            "throw_in_summary" | "_summ_throwins" => BuilderName::ThrowInSummary,
            "corner_takers" | "_pk_corners" => BuilderName::CornerTakers,
            "indirect_free_kick_takers" | "_pk_ifks" => BuilderName::IndirectFreeKickTakers,
            "throw_in_takers" | "_pk_throwins" => BuilderName::ThrowInTakers,
            "corner_contacts" | "_pc_corners" => BuilderName::CornerContacts,
            "indirect_free_kick_contacts" | "_pc_ifks" => BuilderName::IndirectFreeKickContacts,
            "throw_in_contacts" | "_pc_throwins" => BuilderName::ThrowInContacts,
            "players_overview" => BuilderName::PlayersOverview,
            "team_stats_detailed" => BuilderName::TeamStatsDetailed,
            other => BuilderName::Unknown(other.to_string()),
        };
        Ok(builder)
    }
}

impl From<String> for BuilderName {
    fn from(value: String) -> Self {
        match value.parse() {
            Ok(name) => name,
            Err(never) => match never {},
        }
    }
}

impl From<BuilderName> for String {
    fn from(name: BuilderName) -> Self {
        name.as_str().to_string()
    }
}

impl fmt::Display for BuilderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Run a builder against a cache entry's artifacts
///
/// Unknown names return the team aggregate unchanged.
pub fn build(name: &BuilderName, artifacts: &ArtifactSet, options: &BuildOptions) -> DataTable {
    let input = artifacts.get(name.input_artifact(options));
    match name {
        BuilderName::SetPieces => rankings::set_pieces(input, options.defensive),
        BuilderName::Corners => rankings::corners(input, options.defensive),
        BuilderName::DirectFreeKicks => rankings::direct_free_kicks(input, options.defensive),
        BuilderName::IndirectFreeKicks => rankings::indirect_free_kicks(input, options.defensive),
        BuilderName::ThrowIns => rankings::throw_ins(input, options.defensive),
        BuilderName::CornerSummary => summaries::corners(input, options),
        BuilderName::IndirectFreeKickSummary => summaries::indirect_free_kicks(input, options),
        BuilderName::ThrowInSummary => summaries::throw_ins(input, options),
        BuilderName::CornerTakers => players::corner_takers(input, options.side),
        BuilderName::IndirectFreeKickTakers => players::indirect_free_kick_takers(input),
        BuilderName::ThrowInTakers => players::throw_in_takers(input, options.side),
        BuilderName::CornerContacts => players::corner_contacts(input),
        BuilderName::IndirectFreeKickContacts => players::indirect_free_kick_contacts(input),
        BuilderName::ThrowInContacts => players::throw_in_contacts(input),
        BuilderName::PlayersOverview => players::overview(input, &options.rival),
        BuilderName::TeamStatsDetailed => team::stats_detailed(input),
        BuilderName::Unknown(_) => input.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::source::artifacts_from_tables;
    use crate::table::Value;

    #[test]
    fn test_names_round_trip() {
        for name in BuilderName::KNOWN {
            let parsed: BuilderName = name.as_str().parse().unwrap();
            assert_eq!(parsed, name);
            assert!(parsed.is_known());
        }
    }

    #[test]
    fn test_legacy_names_are_accepted() {
        assert_eq!(BuilderName::from("_summ_corners".to_string()), BuilderName::CornerSummary);
        assert_eq!(BuilderName::from("mk_dfk".to_string()), BuilderName::DirectFreeKicks);
        assert_eq!(BuilderName::from("_pc_throwins".to_string()), BuilderName::ThrowInContacts);
    }

    #[test]
    fn test_builder_deserializes_from_yaml() {
        let names: Vec<BuilderName> =
            serde_yaml::from_str("[corner_takers, custom_thing]").unwrap();
        assert_eq!(names[0], BuilderName::CornerTakers);
        assert_eq!(names[1], BuilderName::Unknown("custom_thing".into()));
    }

    #[test]
    fn test_side_is_lenient() {
        assert_eq!(Side::from("LEFT".to_string()), Side::Left);
        assert_eq!(Side::from("middle".to_string()), Side::Right);
        let side: Side = serde_yaml::from_str("left").unwrap();
        assert_eq!(side, Side::Left);
    }

    #[test]
    fn test_input_artifacts() {
        let offensive = BuildOptions::default();
        let defensive = BuildOptions {
            defensive: true,
            ..BuildOptions::default()
        };
        assert_eq!(
            BuilderName::CornerSummary.input_artifact(&defensive),
            ArtifactKind::PairAggregate
        );
        assert_eq!(
            BuilderName::CornerSummary.input_artifact(&offensive),
            ArtifactKind::PlayerAggregate
        );
        assert_eq!(BuilderName::PlayersOverview.input_artifact(&offensive), ArtifactKind::Roster);
        assert_eq!(BuilderName::TeamStatsDetailed.input_artifact(&offensive), ArtifactKind::Events);
        assert_eq!(BuilderName::SetPieces.fill_mode(), FillMode::Direct);
        assert_eq!(BuilderName::ThrowInSummary.fill_mode(), FillMode::HeaderRemap);
        assert_eq!(BuilderName::CornerContacts.fill_mode(), FillMode::Totals);
    }

    #[test]
    fn test_unknown_builder_returns_team_aggregate() {
        let artifacts = artifacts_from_tables(|kind| {
            DataTable::from_rows(vec!["source"], vec![vec![Value::text(kind.file_name())]])
        });
        let out = build(
            &BuilderName::Unknown("mystery".into()),
            &artifacts,
            &BuildOptions::default(),
        );
        assert_eq!(out, artifacts.team_aggregate);
    }
}
