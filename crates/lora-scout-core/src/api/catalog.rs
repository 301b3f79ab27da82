//! Catalog search and token methods on LoraScoutApi.

use serde::{Deserialize, Serialize};

use crate::catalog::{CatalogAuthStatus, PooledSearch};
use crate::error::Result;
use crate::matching::MatchResult;
use crate::settings::SettingsUpdate;
use crate::LoraScoutApi;

/// Best catalog match for a name, with the search log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestMatch {
    #[serde(flatten)]
    pub result: MatchResult,
    /// Whether the configured acceptance threshold is met.
    pub accepted: bool,
    pub search_log: Vec<String>,
}

impl LoraScoutApi {
    // ========================================
    // Catalog Search
    // ========================================

    /// Run every search strategy for `raw` and pool the results.
    pub async fn search_catalog(&self, raw: &str) -> PooledSearch {
        self.state.services().await.catalog.search(raw).await
    }

    /// Search the catalog and select the best candidate for `raw`.
    pub async fn find_best_match(&self, raw: &str) -> BestMatch {
        let policy = self.state.settings.get().await.policy();
        let (result, log) = self.state.services().await.catalog.find_best_match(raw).await;

        BestMatch {
            accepted: result.is_confident(policy),
            search_log: log.iter().map(ToString::to_string).collect(),
            result,
        }
    }

    // ========================================
    // Authentication
    // ========================================

    /// Store a catalog token in the token file and use it immediately.
    ///
    /// Replaces any token kept in settings.
    pub async fn set_civitai_token(&self, token: &str) -> Result<CatalogAuthStatus> {
        let catalog = self.state.services().await.catalog;
        catalog.set_auth_token(token).await?;
        self.drop_settings_token().await?;
        Ok(catalog.auth_status().await)
    }

    /// Remove stored catalog tokens (token file and settings).
    ///
    /// A token from the environment stays in effect.
    pub async fn clear_civitai_token(&self) -> Result<CatalogAuthStatus> {
        let catalog = self.state.services().await.catalog;
        catalog.clear_auth_token().await?;
        self.drop_settings_token().await?;
        catalog.refresh_token(None).await;
        Ok(catalog.auth_status().await)
    }

    async fn drop_settings_token(&self) -> Result<()> {
        if self.state.settings.get().await.civitai_token.is_some() {
            self.state
                .settings
                .update(SettingsUpdate {
                    civitai_token: Some(String::new()),
                    ..Default::default()
                })
                .await?;
        }
        Ok(())
    }

    pub async fn auth_status(&self) -> CatalogAuthStatus {
        self.state.services().await.catalog.auth_status().await
    }
}
