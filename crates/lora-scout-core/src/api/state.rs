//! Shared state behind the API facade and the auto-scan hook.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::catalog::CivitaiClient;
use crate::error::Result;
use crate::library::LoraDirectory;
use crate::matching::NameMatcher;
use crate::network::DownloadManager;
use crate::resolver::{LoraResolver, ResolveOptions, ScanReport};
use crate::settings::{ScoutSettings, SettingsStore};
use crate::workflow::LoraReference;

/// Services derived from the current settings.
///
/// Rebuilt as a whole whenever settings change, so readers always see a
/// consistent matcher, catalog client and directory.
#[derive(Clone)]
pub(crate) struct Services {
    pub(crate) matcher: NameMatcher,
    pub(crate) catalog: Arc<CivitaiClient>,
    pub(crate) directory: LoraDirectory,
    pub(crate) resolver: Arc<LoraResolver>,
}

/// Everything a running API instance owns.
pub(crate) struct ScoutState {
    pub(crate) settings: SettingsStore,
    pub(crate) config_dir: PathBuf,
    pub(crate) downloads: Arc<DownloadManager>,
    /// Builder-level overrides that win over persisted settings.
    pub(crate) lora_dir_override: Option<PathBuf>,
    pub(crate) catalog_base_override: Option<String>,
    services: RwLock<Services>,
}

impl ScoutState {
    pub(crate) async fn new(
        settings: SettingsStore,
        config_dir: PathBuf,
        downloads: Arc<DownloadManager>,
        lora_dir_override: Option<PathBuf>,
        catalog_base_override: Option<String>,
    ) -> Result<Self> {
        let current = settings.get().await;
        let services = Self::build_services(
            &current,
            &settings,
            &config_dir,
            &downloads,
            lora_dir_override.as_deref(),
            catalog_base_override.as_deref(),
        )
        .await?;

        Ok(Self {
            settings,
            config_dir,
            downloads,
            lora_dir_override,
            catalog_base_override,
            services: RwLock::new(services),
        })
    }

    async fn build_services(
        current: &ScoutSettings,
        store: &SettingsStore,
        config_dir: &Path,
        downloads: &Arc<DownloadManager>,
        lora_dir_override: Option<&Path>,
        catalog_base_override: Option<&str>,
    ) -> Result<Services> {
        let matcher = NameMatcher::new(current.match_rules.clone());

        let base = catalog_base_override.unwrap_or(&current.catalog_base_url);
        let catalog =
            CivitaiClient::new(base, config_dir.to_path_buf())?.with_matcher(matcher.clone());
        catalog
            .refresh_token(current.civitai_token.as_deref())
            .await;
        let catalog = Arc::new(catalog);

        let lora_dir = lora_dir_override
            .map(Path::to_path_buf)
            .unwrap_or_else(|| current.resolved_lora_dir(store.root()));
        let directory = LoraDirectory::new(lora_dir);

        let resolver = Arc::new(LoraResolver::new(
            directory.clone(),
            catalog.clone(),
            matcher.clone(),
            downloads.clone(),
        ));

        debug!(
            "Services built: catalog {} dir {}",
            catalog.api_base(),
            directory.path().display()
        );

        Ok(Services {
            matcher,
            catalog,
            directory,
            resolver,
        })
    }

    /// Snapshot of the current services.
    pub(crate) async fn services(&self) -> Services {
        self.services.read().await.clone()
    }

    /// Rebuild services from the persisted settings.
    pub(crate) async fn rebuild(&self) -> Result<()> {
        let current = self.settings.get().await;
        let services = Self::build_services(
            &current,
            &self.settings,
            &self.config_dir,
            &self.downloads,
            self.lora_dir_override.as_deref(),
            self.catalog_base_override.as_deref(),
        )
        .await?;
        *self.services.write().await = services;
        Ok(())
    }

    /// Resolve references with the current services and token.
    pub(crate) async fn resolve(
        &self,
        references: &[LoraReference],
        options: &ResolveOptions,
    ) -> ScanReport {
        let services = self.services().await;
        let token = services.catalog.token().await;
        services
            .resolver
            .resolve(references, options, token.as_deref())
            .await
    }
}
