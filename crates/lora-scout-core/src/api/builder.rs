//! Builder for configuring LoraScoutApi initialization.

use std::path::PathBuf;
use std::sync::Arc;

use crate::api::state::ScoutState;
use crate::catalog;
use crate::error::{Result, ScoutError};
use crate::hooks::{AutoScanHandler, HookRegistry};
use crate::network::DownloadManager;
use crate::settings::SettingsStore;
use crate::LoraScoutApi;

/// Builder for configuring LoraScoutApi initialization.
///
/// # Example
///
/// ```rust,ignore
/// use lora_scout_core::LoraScoutApi;
///
/// let api = LoraScoutApi::builder("./scout-data")
///     .auto_create_dirs(true)
///     .lora_dir("/opt/comfyui/models/loras")
///     .build()
///     .await?;
/// ```
pub struct LoraScoutApiBuilder {
    root: PathBuf,
    auto_create_dirs: bool,
    lora_dir: Option<PathBuf>,
    catalog_base_url: Option<String>,
    config_dir: Option<PathBuf>,
    auto_scan: bool,
}

impl LoraScoutApiBuilder {
    /// Create a new builder with the data root (holds `settings.json`).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            auto_create_dirs: false,
            lora_dir: None,
            catalog_base_url: None,
            config_dir: None,
            auto_scan: true,
        }
    }

    /// Create the data root if it does not exist.
    ///
    /// Default: `false` (the root must exist)
    pub fn auto_create_dirs(mut self, enable: bool) -> Self {
        self.auto_create_dirs = enable;
        self
    }

    /// Use this LoRA directory instead of the one in settings.
    pub fn lora_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.lora_dir = Some(dir.into());
        self
    }

    /// Use this catalog API base instead of the one in settings.
    pub fn catalog_base_url(mut self, base: impl Into<String>) -> Self {
        self.catalog_base_url = Some(base.into());
        self
    }

    /// Directory holding the catalog token file.
    ///
    /// Default: the platform config dir, falling back to the data root.
    pub fn config_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config_dir = Some(dir.into());
        self
    }

    /// Subscribe the auto-scan handler to before-enqueue events.
    ///
    /// Default: `true`
    pub fn with_auto_scan(mut self, enable: bool) -> Self {
        self.auto_scan = enable;
        self
    }

    /// Build the LoraScoutApi instance.
    pub async fn build(self) -> Result<LoraScoutApi> {
        if !self.root.exists() {
            if !self.auto_create_dirs {
                return Err(ScoutError::Config {
                    message: format!("Data root does not exist: {}", self.root.display()),
                });
            }
            std::fs::create_dir_all(&self.root)
                .map_err(|e| ScoutError::io_with_path(e, &self.root))?;
        }

        let config_dir = match self.config_dir {
            Some(dir) => dir,
            None => catalog::default_config_dir().unwrap_or_else(|e| {
                tracing::warn!("{}; storing the token under the data root", e);
                self.root.clone()
            }),
        };

        let settings = SettingsStore::load(&self.root)?;
        let downloads = Arc::new(DownloadManager::new()?);

        let state = Arc::new(
            ScoutState::new(
                settings,
                config_dir,
                downloads,
                self.lora_dir,
                self.catalog_base_url,
            )
            .await?,
        );

        let hooks = Arc::new(HookRegistry::new());
        if self.auto_scan {
            hooks
                .subscribe(Arc::new(AutoScanHandler::new(state.clone())))
                .await;
        }

        tracing::info!("LoRA Scout initialized at {}", self.root.display());

        Ok(LoraScoutApi {
            root: self.root,
            state,
            hooks,
        })
    }
}
