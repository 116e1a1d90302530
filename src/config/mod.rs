use anyhow::{anyhow, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::cache::EvictionPolicy;
use crate::retry::RetryPolicy;

pub mod loader;
pub mod pages;

pub use loader::{load_pages, load_settings};
pub use pages::{
    BadgeOwner, BadgeSpec, ImageItem, OperationName, PageConfig, PagesConfig, PruneCondition,
    PruneSpec, Replacement, TableSpec, TableTarget,
};

/// Header text the templates carry until `replace_header` runs
pub const DEFAULT_HEADER_PLACEHOLDER: &str = "Matchday 1 | CHA (A)";

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "matchdoc", "matchdoc")
}

/// Get the directory holding cached datasets
pub fn get_default_cache_dir() -> Result<PathBuf> {
    project_dirs()
        .map(|dirs| dirs.cache_dir().join("datasets"))
        .ok_or_else(|| anyhow!("Could not determine home directory"))
}

/// Get the default settings file location
pub fn get_default_settings_path() -> Result<PathBuf> {
    project_dirs()
        .map(|dirs| dirs.config_dir().join("config.toml"))
        .ok_or_else(|| anyhow!("Could not determine home directory"))
}

/// Process-wide settings, read from TOML and overridable through `MATCHDOC_*`
/// environment variables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    #[serde(default)]
    pub eviction: EvictionPolicy,

    /// Policy for calls into the rendering host
    #[serde(default)]
    pub host_retry: RetryPolicy,

    /// Policy for the dataset computation on a cache miss
    #[serde(default = "RetryPolicy::no_retry")]
    pub source_retry: RetryPolicy,

    #[serde(default = "default_decimal_separator")]
    pub decimal_separator: char,

    #[serde(default = "default_header_placeholder")]
    pub header_placeholder: String,

    /// Command line that computes the datasets on a cache miss
    #[serde(default)]
    pub data_command: Option<String>,

    #[serde(default)]
    pub log_level: Option<String>,

    #[serde(default = "default_team_color")]
    pub highlight_team_color: String,

    #[serde(default = "default_rival_color")]
    pub highlight_rival_color: String,

    /// Extra image builders: name to command line
    #[serde(default)]
    pub image_commands: BTreeMap<String, String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            eviction: EvictionPolicy::default(),
            host_retry: RetryPolicy::default(),
            source_retry: RetryPolicy::no_retry(),
            decimal_separator: default_decimal_separator(),
            header_placeholder: default_header_placeholder(),
            data_command: None,
            log_level: None,
            highlight_team_color: default_team_color(),
            highlight_rival_color: default_rival_color(),
            image_commands: BTreeMap::new(),
        }
    }
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn merge_env_vars(&mut self) {
        if let Ok(dir) = std::env::var("MATCHDOC_CACHE_DIR") {
            self.cache_dir = PathBuf::from(dir);
        }

        if let Ok(log_level) = std::env::var("MATCHDOC_LOG_LEVEL") {
            self.log_level = Some(log_level);
        }

        if let Ok(command) = std::env::var("MATCHDOC_DATA_COMMAND") {
            self.data_command = Some(command);
        }

        if let Ok(separator) = std::env::var("MATCHDOC_DECIMAL_SEPARATOR") {
            if let Some(c) = separator.chars().next() {
                self.decimal_separator = c;
            }
        }
    }
}

// Default functions for serde
fn default_cache_dir() -> PathBuf {
    get_default_cache_dir().unwrap_or_else(|_| PathBuf::from(".matchdoc-cache"))
}

fn default_decimal_separator() -> char {
    ','
}

fn default_header_placeholder() -> String {
    DEFAULT_HEADER_PLACEHOLDER.to_string()
}

fn default_team_color() -> String {
    "#D9E1F2".to_string()
}

fn default_rival_color() -> String {
    "#FCE4D6".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_defaults() {
        let settings = Settings::new();
        assert_eq!(settings.decimal_separator, ',');
        assert_eq!(settings.header_placeholder, DEFAULT_HEADER_PLACEHOLDER);
        assert_eq!(settings.host_retry.max_attempts, 12);
        assert_eq!(settings.source_retry.max_attempts, 1);
        assert_eq!(settings.eviction, EvictionPolicy::Unbounded);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings: Settings = toml::from_str(
            r#"
cache_dir = "/var/cache/matchdoc"
decimal_separator = "."
data_command = "python build_datasets.py"

[eviction]
kind = "ttl"
ttl = "7days"

[host_retry]
max_attempts = 5
base_delay = "100ms"

[image_commands]
plot_team_overview = "python charts.py overview"
"#,
        )
        .unwrap();

        assert_eq!(settings.cache_dir, PathBuf::from("/var/cache/matchdoc"));
        assert_eq!(settings.decimal_separator, '.');
        assert_eq!(
            settings.eviction,
            EvictionPolicy::Ttl {
                ttl: Duration::from_secs(7 * 24 * 3600)
            }
        );
        assert_eq!(settings.host_retry.max_attempts, 5);
        assert_eq!(settings.host_retry.factor, 1.6);
        assert_eq!(settings.source_retry, RetryPolicy::no_retry());
        assert_eq!(settings.image_commands.len(), 1);
    }
}
