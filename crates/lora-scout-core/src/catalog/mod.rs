//! CivitAI catalog client.
//!
//! Provides integration with the CivitAI models API:
//! - Multi-strategy LoRA search with pooled results
//! - Best-match resolution for a local name
//! - Authentication token management
//!
//! # Module Organization
//!
//! - [`types`] - API response structs with lenient decoding
//! - [`search`] - Strategy construction and the pooled search loop
//! - [`auth`] - Token resolution and persistence

mod auth;
mod search;
mod types;

pub use auth::{
    clear_token, default_config_dir, resolve_token, save_token, token_path, CatalogAuthStatus,
    TokenSource,
};
pub use search::{
    build_strategies, search_with_strategies, CatalogSource, PooledSearch, SearchStrategy,
    StrategyKind, StrategyLogEntry, StrategyOutcome,
};
pub use types::{CatalogFile, CatalogId, CatalogModel, ModelVersion};

use crate::config::{AppConfig, CatalogConfig, NetworkConfig};
use crate::error::{Result, ScoutError};
use crate::matching::{MatchResult, NameMatcher};
use async_trait::async_trait;
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};
use types::SearchResponse;

/// Search the catalog with every strategy and pick the best candidate.
///
/// Returns the selection together with the strategy log. An empty pool
/// yields [`MatchResult::none`].
pub async fn find_best_match(
    source: &dyn CatalogSource,
    raw: &str,
    matcher: &NameMatcher,
) -> (MatchResult, Vec<StrategyLogEntry>) {
    let pooled = search_with_strategies(source, raw, matcher).await;
    let result = matcher.select_best(raw, &pooled.candidates);
    debug!(
        "Best match for '{}': {:?} (score {:.3}) from {} candidates",
        raw,
        result.candidate.as_ref().map(|c| c.display_name()),
        result.score,
        pooled.candidates.len()
    );
    (result, pooled.log)
}

/// Client for the CivitAI models API.
pub struct CivitaiClient {
    client: Client,
    api_base: String,
    /// Directory holding the token file
    config_dir: PathBuf,
    matcher: NameMatcher,
    auth: Arc<RwLock<Option<(String, TokenSource)>>>,
}

impl std::fmt::Debug for CivitaiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CivitaiClient")
            .field("api_base", &self.api_base)
            .field("config_dir", &self.config_dir)
            .field("auth_token", &"<redacted>")
            .finish()
    }
}

impl CivitaiClient {
    /// Create a client against `api_base` (e.g. `https://civitai.com/api/v1`).
    ///
    /// The initial token is resolved from the environment and the token file
    /// in `config_dir`. Call [`refresh_token`](Self::refresh_token) to give a
    /// settings token precedence.
    pub fn new(api_base: impl Into<String>, config_dir: impl Into<PathBuf>) -> Result<Self> {
        let client = Client::builder()
            .timeout(NetworkConfig::REQUEST_TIMEOUT)
            .user_agent(AppConfig::USER_AGENT)
            .build()
            .map_err(|e| ScoutError::Network {
                message: format!("Failed to create HTTP client: {}", e),
                cause: None,
            })?;

        let config_dir = config_dir.into();
        let initial = resolve_token(None, &config_dir);
        if let Some((_, source)) = &initial {
            info!("CivitAI token found from {:?}", source);
        }

        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            config_dir,
            matcher: NameMatcher::default(),
            auth: Arc::new(RwLock::new(initial)),
        })
    }

    /// Client against the public CivitAI API.
    pub fn with_default_base(config_dir: impl Into<PathBuf>) -> Result<Self> {
        Self::new(CatalogConfig::API_BASE, config_dir)
    }

    /// Replace the matcher used by [`find_best_match`](Self::find_best_match).
    pub fn with_matcher(mut self, matcher: NameMatcher) -> Self {
        self.matcher = matcher;
        self
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn matcher(&self) -> &NameMatcher {
        &self.matcher
    }

    // ========================================
    // Authentication
    // ========================================

    /// Re-resolve the token, giving `explicit` (from settings) precedence.
    pub async fn refresh_token(&self, explicit: Option<&str>) -> Option<TokenSource> {
        let resolved = resolve_token(explicit, &self.config_dir);
        let source = resolved.as_ref().map(|(_, source)| *source);
        *self.auth.write().await = resolved;
        source
    }

    /// Persist a token to the token file and use it immediately.
    pub async fn set_auth_token(&self, token: &str) -> Result<()> {
        save_token(&self.config_dir, token)?;
        *self.auth.write().await = Some((token.trim().to_string(), TokenSource::TokenFile));
        info!("CivitAI token saved");
        Ok(())
    }

    /// Remove the token file and forget the in-memory token.
    pub async fn clear_auth_token(&self) -> Result<()> {
        clear_token(&self.config_dir)?;
        *self.auth.write().await = None;
        info!("CivitAI token cleared");
        Ok(())
    }

    pub async fn auth_status(&self) -> CatalogAuthStatus {
        let guard = self.auth.read().await;
        CatalogAuthStatus {
            has_token: guard.is_some(),
            token_source: guard.as_ref().map(|(_, source)| *source),
        }
    }

    /// The active token, if any.
    pub async fn token(&self) -> Option<String> {
        self.auth.read().await.as_ref().map(|(token, _)| token.clone())
    }

    async fn auth_header_value(&self) -> Option<String> {
        self.token().await.map(|t| format!("Bearer {}", t))
    }

    // ========================================
    // Search
    // ========================================

    fn search_url(&self, query: &str, limit: u32) -> String {
        format!(
            "{}/models?query={}&types={}&sort={}&limit={}",
            self.api_base,
            urlencoding::encode(query),
            CatalogConfig::MODEL_TYPE,
            urlencoding::encode(CatalogConfig::SORT),
            limit
        )
    }

    /// Run every search strategy for `raw` and pool the results.
    pub async fn search(&self, raw: &str) -> PooledSearch {
        search_with_strategies(self, raw, &self.matcher).await
    }

    /// Search with every strategy and select the best candidate.
    pub async fn find_best_match(&self, raw: &str) -> (MatchResult, Vec<StrategyLogEntry>) {
        find_best_match(self, raw, &self.matcher).await
    }
}

#[async_trait]
impl CatalogSource for CivitaiClient {
    async fn search_models(&self, query: &str, limit: u32) -> Result<Vec<CatalogModel>> {
        let url = self.search_url(query, limit);
        debug!("Catalog search: {}", url);

        let mut request = self.client.get(&url);
        if let Some(auth) = self.auth_header_value().await {
            request = request.header("Authorization", auth);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ScoutError::Timeout(NetworkConfig::REQUEST_TIMEOUT)
            } else {
                ScoutError::Network {
                    message: format!("CivitAI request failed: {}", e),
                    cause: Some(e.to_string()),
                }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScoutError::CatalogStatus {
                query: query.to_string(),
                status: status.as_u16(),
            });
        }

        let body: SearchResponse = response.json().await.map_err(|e| ScoutError::Json {
            message: format!("Failed to parse CivitAI response: {}", e),
            source: None,
        })?;

        Ok(body.into_models())
    }
}
