//! CivitAI API token management.
//!
//! Handles token resolution from settings, environment and the token file,
//! plus persistence of the token file.

use crate::config::{AppConfig, CatalogConfig};
use crate::error::{Result, ScoutError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Where the active token came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenSource {
    Settings,
    EnvVar,
    TokenFile,
}

/// Whether a token is configured and where it came from.
///
/// The token itself is never exposed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogAuthStatus {
    pub has_token: bool,
    pub token_source: Option<TokenSource>,
}

/// Platform config directory for LoRA Scout (`~/.config/lora-scout` on Linux).
pub fn default_config_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join(AppConfig::APP_CONFIG_DIR_NAME))
        .ok_or_else(|| ScoutError::Config {
            message: "Could not determine the platform config directory".into(),
        })
}

/// Path of the token file inside `config_dir`.
pub fn token_path(config_dir: &Path) -> PathBuf {
    config_dir.join(CatalogConfig::TOKEN_FILENAME)
}

fn non_empty(token: &str) -> Option<String> {
    let token = token.trim();
    (!token.is_empty()).then(|| token.to_string())
}

/// Resolve a token.
///
/// Checks in order:
/// 1. `explicit` (the token stored in settings)
/// 2. `CIVITAI_TOKEN` environment variable
/// 3. The token file in `config_dir`
pub fn resolve_token(explicit: Option<&str>, config_dir: &Path) -> Option<(String, TokenSource)> {
    let env_value = std::env::var(CatalogConfig::TOKEN_ENV_VAR).ok();
    resolve_token_from(explicit, env_value.as_deref(), config_dir)
}

fn resolve_token_from(
    explicit: Option<&str>,
    env_value: Option<&str>,
    config_dir: &Path,
) -> Option<(String, TokenSource)> {
    if let Some(token) = explicit.and_then(non_empty) {
        return Some((token, TokenSource::Settings));
    }

    if let Some(token) = env_value.and_then(non_empty) {
        return Some((token, TokenSource::EnvVar));
    }

    std::fs::read_to_string(token_path(config_dir))
        .ok()
        .and_then(|content| non_empty(&content))
        .map(|token| (token, TokenSource::TokenFile))
}

/// Write the token file, creating `config_dir` if needed.
///
/// The file is made owner-only on Unix.
pub fn save_token(config_dir: &Path, token: &str) -> Result<()> {
    let token = non_empty(token).ok_or_else(|| ScoutError::InvalidParams {
        message: "Token must not be empty".into(),
    })?;

    std::fs::create_dir_all(config_dir)
        .map_err(|e| ScoutError::io_with_path(e, config_dir))?;
    let path = token_path(config_dir);
    std::fs::write(&path, token).map_err(|e| ScoutError::io_with_path(e, &path))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))
            .map_err(|e| ScoutError::io_with_path(e, &path))?;
    }

    Ok(())
}

/// Delete the token file if present.
pub fn clear_token(config_dir: &Path) -> Result<()> {
    let path = token_path(config_dir);
    if path.exists() {
        std::fs::remove_file(&path).map_err(|e| ScoutError::io_with_path(e, &path))?;
    }
    Ok(())
}
