//! Report parameters and their content fingerprint
//!
//! A [`ParameterSet`] is captured once per run. Its [`Fingerprint`] is a
//! SHA-256 digest over a canonical join of every field, so field-wise equal
//! sets always address the same cache namespace.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

use crate::error::{ErrorCode, ReportError};

static SLUG_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("Valid regex pattern"));

/// Number of fingerprint hex characters kept in the namespace name
const NAMESPACE_HASH_LEN: usize = 16;

/// Venue of the analysed fixture from the rival's perspective
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Home,
    Away,
}

impl Field {
    /// One-letter code used in headers and titles
    pub fn code(&self) -> &'static str {
        match self {
            Field::Home => "H",
            Field::Away => "A",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Home => "home",
            Field::Away => "away",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Field {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "home" | "h" => Ok(Field::Home),
            "away" | "a" => Ok(Field::Away),
            other => Err(ReportError::validation_with_code(
                ErrorCode::VALIDATION_INVALID_FORMAT,
                format!("expected 'home' or 'away', got '{}'", other),
                Some("field".to_string()),
            )),
        }
    }
}

/// Immutable selection describing one report
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ParameterSet {
    team: String,
    rival: String,
    competition: String,
    field: Field,
    season: String,
    sample_size: u32,
}

impl ParameterSet {
    /// Validate and capture a parameter set
    pub fn new(
        team: impl Into<String>,
        rival: impl Into<String>,
        competition: impl Into<String>,
        field: Field,
        season: impl Into<String>,
        sample_size: u32,
    ) -> Result<Self, ReportError> {
        let params = Self {
            team: team.into().trim().to_string(),
            rival: rival.into().trim().to_string(),
            competition: competition.into().trim().to_string(),
            field,
            season: season.into().trim().to_string(),
            sample_size,
        };

        for (name, value) in [
            ("team", &params.team),
            ("rival", &params.rival),
            ("competition", &params.competition),
            ("season", &params.season),
        ] {
            if value.is_empty() {
                return Err(ReportError::validation_with_code(
                    ErrorCode::VALIDATION_REQUIRED_FIELD,
                    "must not be empty",
                    Some(name.to_string()),
                ));
            }
        }

        if params.sample_size == 0 {
            return Err(ReportError::validation_with_code(
                ErrorCode::VALIDATION_OUT_OF_RANGE,
                "must be a positive number of matches",
                Some("sample_size".to_string()),
            ));
        }

        Ok(params)
    }

    pub fn team(&self) -> &str {
        &self.team
    }

    pub fn rival(&self) -> &str {
        &self.rival
    }

    pub fn competition(&self) -> &str {
        &self.competition
    }

    pub fn field(&self) -> Field {
        self.field
    }

    pub fn season(&self) -> &str {
        &self.season
    }

    pub fn sample_size(&self) -> u32 {
        self.sample_size
    }

    /// Canonical string every fingerprint is derived from
    pub fn canonical(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}|{}",
            self.team, self.rival, self.competition, self.field, self.season, self.sample_size
        )
    }

    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of(self)
    }

    /// Directory-safe namespace for this set's cache entry
    pub fn namespace(&self) -> String {
        let fingerprint = self.fingerprint();
        format!(
            "{}__{}__{}__{}",
            slugify(&self.team),
            slugify(&self.rival),
            slugify(&self.season),
            fingerprint.short(NAMESPACE_HASH_LEN)
        )
    }
}

impl<'de> Deserialize<'de> for ParameterSet {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            team: String,
            rival: String,
            competition: String,
            field: Field,
            season: String,
            sample_size: u32,
        }

        let raw = Raw::deserialize(deserializer)?;
        ParameterSet::new(
            raw.team,
            raw.rival,
            raw.competition,
            raw.field,
            raw.season,
            raw.sample_size,
        )
        .map_err(serde::de::Error::custom)
    }
}

/// Hex-encoded SHA-256 digest of a parameter set
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn of(params: &ParameterSet) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(params.canonical().as_bytes());
        Self(format!("{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Leading `len` hex characters
    pub fn short(&self, len: usize) -> &str {
        &self.0[..len.min(self.0.len())]
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lowercase, collapse every non-alphanumeric run into a single dash
pub fn slugify(value: &str) -> String {
    let lowered = value.trim().to_lowercase();
    SLUG_REGEX
        .replace_all(&lowered, "-")
        .trim_matches('-')
        .to_string()
}
