use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::models::Settings;

const ENV_SERVER_URL: &str = "RADARWATCH_SERVER_URL";

pub fn load_dotenv() {
    let _ = dotenvy::dotenv();
}

pub fn server_url_from_env() -> Option<String> {
    std::env::var(ENV_SERVER_URL)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn default_settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("radarwatch").join("settings.json"))
}

/// Reads settings from `path` (or the default location). A missing file
/// yields defaults; an unreadable or invalid one is an error.
pub fn load_settings(path: Option<&Path>) -> Result<Settings> {
    let path = match path.map(Path::to_path_buf).or_else(default_settings_path) {
        Some(path) => path,
        None => return Ok(Settings::default()),
    };
    if !path.exists() {
        log::debug!("[Config] No settings at {}, using defaults", path.display());
        return Ok(Settings::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read settings from {}", path.display()))?;
    let settings: Settings = serde_json::from_str(&content)
        .with_context(|| format!("invalid settings in {}", path.display()))?;
    Ok(settings)
}

/// Environment beats the settings file; an explicit override beats both.
pub fn apply_overrides(settings: &mut Settings, env_url: Option<String>, explicit_url: Option<String>) {
    if let Some(url) = explicit_url.or(env_url) {
        settings.server.base_url = url;
    }
}
