use std::path::Path;
use tokio::fs;
use tracing::{debug, warn};

use super::{get_default_settings_path, PagesConfig, Settings};
use crate::error::{ErrorCode, ReportError, Result};

/// Load settings from `path`, or from the default location when it exists,
/// then apply `MATCHDOC_*` overrides
pub async fn load_settings(path: Option<&Path>) -> Result<Settings> {
    let explicit = path.is_some();
    let path = match path {
        Some(path) => Some(path.to_path_buf()),
        None => get_default_settings_path().ok(),
    };

    let mut settings = match path {
        Some(path) if explicit || fs::try_exists(&path).await.unwrap_or(false) => {
            debug!("Loading settings from {}", path.display());
            let content = fs::read_to_string(&path).await.map_err(|e| {
                ReportError::config_with_code(
                    ErrorCode::CONFIG_NOT_FOUND,
                    format!("Cannot read settings {}: {}", path.display(), e),
                )
            })?;
            toml::from_str::<Settings>(&content).map_err(|e| {
                ReportError::config_with_code(
                    ErrorCode::CONFIG_INVALID_TOML,
                    format!("Invalid settings {}: {}", path.display(), e),
                )
            })?
        }
        _ => Settings::default(),
    };

    settings.merge_env_vars();
    Ok(settings)
}

/// Load the page configuration; `.json` files are JSON, anything else YAML
pub async fn load_pages(path: &Path) -> Result<PagesConfig> {
    let content = fs::read_to_string(path).await.map_err(|e| {
        ReportError::config_with_code(
            ErrorCode::CONFIG_NOT_FOUND,
            format!("Cannot read page configuration {}: {}", path.display(), e),
        )
    })?;

    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let pages: PagesConfig = if is_json {
        serde_json::from_str(&content).map_err(|e| e.to_string())
    } else {
        serde_yaml::from_str(&content).map_err(|e| e.to_string())
    }
    .map_err(|e| {
        ReportError::config_with_code(
            ErrorCode::CONFIG_INVALID_YAML,
            format!("Invalid page configuration {}: {}", path.display(), e),
        )
    })?;

    if pages.pages.is_empty() {
        return Err(ReportError::config_with_code(
            ErrorCode::CONFIG_INVALID_VALUE,
            format!("{} declares no pages", path.display()),
        ));
    }
    for warning in pages.warnings() {
        warn!("{}", warning);
    }
    Ok(pages)
}
