//! Persisted user settings.
//!
//! Settings live in `<root>/settings.json` and are rewritten atomically:
//! serialize to a temp file with a PID+TID suffix, re-parse, fsync, rename.

use crate::config::{AppConfig, CatalogConfig, LoraConfig};
use crate::error::{Result, ScoutError};
use crate::matching::{AcceptancePolicy, MatchRules};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Platform data directory for LoRA Scout (`~/.local/share/lora-scout` on Linux).
pub fn default_data_root() -> Result<PathBuf> {
    dirs::data_dir()
        .map(|dir| dir.join(AppConfig::APP_CONFIG_DIR_NAME))
        .ok_or_else(|| ScoutError::Config {
            message: "Could not determine the platform data directory".into(),
        })
}

fn default_true() -> bool {
    true
}

fn default_min_score() -> f64 {
    AcceptancePolicy::ENHANCED.min_score
}

fn default_catalog_base_url() -> String {
    CatalogConfig::API_BASE.to_string()
}

/// User-editable settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoutSettings {
    /// LoRA directory; `<root>/loras` when unset.
    #[serde(default)]
    pub lora_dir: Option<PathBuf>,
    #[serde(default)]
    pub civitai_token: Option<String>,
    /// Scan every workflow before it is enqueued.
    #[serde(default)]
    pub auto_mode: bool,
    /// Download missing LoRAs when a confident match is found.
    #[serde(default = "default_true")]
    pub auto_download: bool,
    /// Minimum similarity to accept a catalog match.
    #[serde(default = "default_min_score")]
    pub min_match_score: f64,
    #[serde(default = "default_catalog_base_url")]
    pub catalog_base_url: String,
    #[serde(default)]
    pub match_rules: MatchRules,
}

impl Default for ScoutSettings {
    fn default() -> Self {
        Self {
            lora_dir: None,
            civitai_token: None,
            auto_mode: false,
            auto_download: true,
            min_match_score: default_min_score(),
            catalog_base_url: default_catalog_base_url(),
            match_rules: MatchRules::default(),
        }
    }
}

impl ScoutSettings {
    pub fn policy(&self) -> AcceptancePolicy {
        AcceptancePolicy::new(self.min_match_score)
    }

    /// The configured LoRA directory, or `<root>/loras`.
    pub fn resolved_lora_dir(&self, root: &Path) -> PathBuf {
        self.lora_dir
            .clone()
            .unwrap_or_else(|| root.join(LoraConfig::DEFAULT_DIR_NAME))
    }

    /// Settings as shown to the host: the token is replaced by a flag.
    pub fn public_view(&self, root: &Path) -> SettingsView {
        SettingsView {
            lora_dir: self.resolved_lora_dir(root),
            has_civitai_token: self.civitai_token.as_deref().is_some_and(|t| !t.is_empty()),
            auto_mode: self.auto_mode,
            auto_download: self.auto_download,
            min_match_score: self.min_match_score,
            catalog_base_url: self.catalog_base_url.clone(),
            match_rules: self.match_rules.clone(),
        }
    }
}

/// Settings without the secret token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsView {
    pub lora_dir: PathBuf,
    pub has_civitai_token: bool,
    pub auto_mode: bool,
    pub auto_download: bool,
    pub min_match_score: f64,
    pub catalog_base_url: String,
    pub match_rules: MatchRules,
}

/// Partial settings update. `None` leaves a field unchanged; an empty
/// token string clears the stored token.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsUpdate {
    #[serde(default)]
    pub lora_dir: Option<PathBuf>,
    #[serde(default)]
    pub civitai_token: Option<String>,
    #[serde(default)]
    pub auto_mode: Option<bool>,
    #[serde(default)]
    pub auto_download: Option<bool>,
    #[serde(default)]
    pub min_match_score: Option<f64>,
    #[serde(default)]
    pub catalog_base_url: Option<String>,
    #[serde(default)]
    pub match_rules: Option<MatchRules>,
}

impl SettingsUpdate {
    fn validate(&self) -> Result<()> {
        if let Some(score) = self.min_match_score {
            if !(0.0..=1.0).contains(&score) {
                return Err(ScoutError::InvalidParams {
                    message: format!("min_match_score must be within 0..=1, got {}", score),
                });
            }
        }

        if let Some(base) = &self.catalog_base_url {
            let parsed = url::Url::parse(base).map_err(|e| ScoutError::InvalidParams {
                message: format!("Invalid catalog_base_url '{}': {}", base, e),
            })?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(ScoutError::InvalidParams {
                    message: format!("catalog_base_url must be http(s), got '{}'", base),
                });
            }
        }

        Ok(())
    }

    fn apply(self, settings: &mut ScoutSettings) {
        if let Some(dir) = self.lora_dir {
            settings.lora_dir = Some(dir);
        }
        if let Some(token) = self.civitai_token {
            let token = token.trim().to_string();
            settings.civitai_token = (!token.is_empty()).then_some(token);
        }
        if let Some(auto_mode) = self.auto_mode {
            settings.auto_mode = auto_mode;
        }
        if let Some(auto_download) = self.auto_download {
            settings.auto_download = auto_download;
        }
        if let Some(score) = self.min_match_score {
            settings.min_match_score = score;
        }
        if let Some(base) = self.catalog_base_url {
            settings.catalog_base_url = base.trim_end_matches('/').to_string();
        }
        if let Some(rules) = self.match_rules {
            settings.match_rules = rules;
        }
    }
}

/// Settings backed by `<root>/settings.json`.
#[derive(Debug)]
pub struct SettingsStore {
    root: PathBuf,
    path: PathBuf,
    current: RwLock<ScoutSettings>,
}

impl SettingsStore {
    /// Load settings from `root`, falling back to defaults when absent.
    pub fn load(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let path = root.join(AppConfig::SETTINGS_FILENAME);
        let settings = read_json::<ScoutSettings>(&path)?.unwrap_or_default();
        debug!("Loaded settings from {}", path.display());

        Ok(Self {
            root,
            path,
            current: RwLock::new(settings),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn get(&self) -> ScoutSettings {
        self.current.read().await.clone()
    }

    pub async fn view(&self) -> SettingsView {
        self.current.read().await.public_view(&self.root)
    }

    pub async fn lora_dir(&self) -> PathBuf {
        self.current.read().await.resolved_lora_dir(&self.root)
    }

    /// Validate, apply and persist an update.
    pub async fn update(&self, update: SettingsUpdate) -> Result<ScoutSettings> {
        update.validate()?;

        let mut guard = self.current.write().await;
        let mut next = guard.clone();
        update.apply(&mut next);
        write_json_atomic(&self.path, &next)?;
        *guard = next.clone();

        info!("Settings updated");
        Ok(next)
    }
}

/// Read and parse a JSON file. `None` if it does not exist.
fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }

    let contents = fs::read_to_string(path).map_err(|e| ScoutError::io_with_path(e, path))?;
    let data = serde_json::from_str(&contents).map_err(|e| ScoutError::Json {
        message: format!("Failed to parse {}: {}", path.display(), e),
        source: Some(e),
    })?;
    Ok(Some(data))
}

/// Write JSON atomically via a PID+TID temp file, fsync and rename.
///
/// The file is owner-only on Unix.
fn write_json_atomic<T: Serialize>(path: &Path, data: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| ScoutError::io_with_path(e, parent))?;
    }

    let temp_path = path.with_extension(format!("json.{}.{}.tmp", std::process::id(), thread_id()));

    let serialized = serde_json::to_string_pretty(data)?;
    serde_json::from_str::<serde_json::Value>(&serialized).map_err(|e| ScoutError::Json {
        message: format!("JSON validation failed: {}", e),
        source: Some(e),
    })?;

    let written = (|| -> std::io::Result<()> {
        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        // Settings may carry the catalog token.
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&temp_path)?;
        file.write_all(serialized.as_bytes())?;
        file.flush()?;
        file.sync_all()
    })();

    if let Err(e) = written.and_then(|()| fs::rename(&temp_path, path)) {
        let _ = fs::remove_file(&temp_path);
        return Err(ScoutError::io_with_path(e, path));
    }

    debug!("Atomically wrote {}", path.display());
    Ok(())
}

/// Numeric identifier for the current thread.
fn thread_id() -> u64 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    std::thread::current().id().hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_defaults_when_missing() {
        let temp = TempDir::new().unwrap();
        let store = SettingsStore::load(temp.path()).unwrap();
        let settings = store.get().await;

        assert_eq!(settings, ScoutSettings::default());
        assert!(!settings.auto_mode);
        assert!(settings.auto_download);
        assert_eq!(settings.policy(), AcceptancePolicy::ENHANCED);
        assert_eq!(store.lora_dir().await, temp.path().join("loras"));
    }

    #[tokio::test]
    async fn test_update_persists_and_reloads() {
        let temp = TempDir::new().unwrap();
        let store = SettingsStore::load(temp.path()).unwrap();

        store
            .update(SettingsUpdate {
                auto_mode: Some(true),
                civitai_token: Some(" tok ".into()),
                min_match_score: Some(0.3),
                catalog_base_url: Some("http://localhost:9000/api/v1/".into()),
                ..SettingsUpdate::default()
            })
            .await
            .unwrap();

        let reloaded = SettingsStore::load(temp.path()).unwrap().get().await;
        assert!(reloaded.auto_mode);
        assert_eq!(reloaded.civitai_token.as_deref(), Some("tok"));
        assert_eq!(reloaded.policy(), AcceptancePolicy::LEGACY);
        assert_eq!(reloaded.catalog_base_url, "http://localhost:9000/api/v1");

        // No temp files left behind.
        let leftovers: Vec<_> = fs::read_dir(temp.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_empty_token_clears() {
        let temp = TempDir::new().unwrap();
        let store = SettingsStore::load(temp.path()).unwrap();
        store
            .update(SettingsUpdate {
                civitai_token: Some("tok".into()),
                ..SettingsUpdate::default()
            })
            .await
            .unwrap();
        let settings = store
            .update(SettingsUpdate {
                civitai_token: Some(String::new()),
                ..SettingsUpdate::default()
            })
            .await
            .unwrap();
        assert_eq!(settings.civitai_token, None);
        assert!(!store.view().await.has_civitai_token);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_settings_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let store = SettingsStore::load(temp.path()).unwrap();
        store
            .update(SettingsUpdate {
                civitai_token: Some("secret-tok".into()),
                ..SettingsUpdate::default()
            })
            .await
            .unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert!(fs::read_to_string(store.path()).unwrap().contains("secret-tok"));
    }

    #[tokio::test]
    async fn test_invalid_updates_are_rejected() {
        let temp = TempDir::new().unwrap();
        let store = SettingsStore::load(temp.path()).unwrap();

        for update in [
            SettingsUpdate {
                min_match_score: Some(1.5),
                ..SettingsUpdate::default()
            },
            SettingsUpdate {
                catalog_base_url: Some("ftp://example.test".into()),
                ..SettingsUpdate::default()
            },
            SettingsUpdate {
                catalog_base_url: Some("not a url".into()),
                ..SettingsUpdate::default()
            },
        ] {
            let err = store.update(update).await.unwrap_err();
            assert_eq!(err.to_rpc_error_code(), -32602);
        }
        assert!(!store.path().exists());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("settings.json"),
            r#"{"auto_mode": true, "lora_dir": "/models/loras"}"#,
        )
        .unwrap();

        let settings = read_json::<ScoutSettings>(&temp.path().join("settings.json"))
            .unwrap()
            .unwrap();
        assert!(settings.auto_mode);
        assert!(settings.auto_download);
        assert_eq!(settings.lora_dir, Some(PathBuf::from("/models/loras")));
        assert_eq!(settings.match_rules, MatchRules::default());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("settings.json"), "{oops").unwrap();
        assert!(matches!(
            SettingsStore::load(temp.path()),
            Err(ScoutError::Json { .. })
        ));
    }

    #[test]
    fn test_public_view_hides_token() {
        let settings = ScoutSettings {
            civitai_token: Some("secret".into()),
            ..ScoutSettings::default()
        };
        let json = serde_json::to_string(&settings.public_view(Path::new("/data"))).unwrap();
        assert!(!json.contains("secret"));
        assert!(json.contains("\"has_civitai_token\":true"));
    }
}
