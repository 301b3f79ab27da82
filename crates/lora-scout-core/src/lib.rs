//! LoRA Scout Core - Headless library that finds the LoRA files a node-graph
//! workflow needs.
//!
//! Local names rarely match catalog names exactly, so missing LoRAs are
//! resolved against the CivitAI catalog with fuzzy matching: normalize the
//! name, search with several query strategies, score every candidate and
//! download the best confident match.
//!
//! # Example
//!
//! ```rust,ignore
//! use lora_scout_core::LoraScoutApi;
//!
//! #[tokio::main]
//! async fn main() -> lora_scout_core::Result<()> {
//!     let api = LoraScoutApi::new("/path/to/data").await?;
//!
//!     let best = api.find_best_match("GoodHands-beta2.safetensors").await;
//!     println!("{:?} (score {:.2})", best.result.candidate, best.result.score);
//!
//!     let report = api.scan_workflow(&workflow_json, None).await;
//!     println!("{}", report.render());
//!
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod hooks;
pub mod library;
pub mod matching;
pub mod network;
pub mod resolver;
pub mod settings;
pub mod workflow;

mod api;

// Re-export commonly used types
pub use catalog::{
    CatalogModel, CatalogSource, CivitaiClient, PooledSearch, StrategyKind, StrategyLogEntry,
};
pub use error::{Result, ScoutError};
pub use hooks::{BeforeEnqueueHandler, EnqueueEvent, HandlerReport, HookOutcome, SubscriptionId};
pub use library::{DirectoryHealth, DuplicateGroup, LoraDirectory, LoraFileEntry};
pub use matching::{
    extract_keywords, normalize, select_best, similarity, AcceptancePolicy, MatchResult,
    MatchRules, MatchSource, NameMatcher,
};
pub use network::{ActiveDownload, DownloadManager, DownloadOutcome, DownloadProgress};
pub use resolver::{LoraResolver, ResolveEntry, ResolveOptions, ResolveOutcome, ScanReport};
pub use settings::{ScoutSettings, SettingsUpdate, SettingsView};
pub use workflow::LoraReference;

pub use api::{BestMatch, LoraScoutApiBuilder};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use api::state::ScoutState;
use hooks::HookRegistry;

/// Main API struct for LoRA Scout operations.
///
/// Owns the settings store, the LoRA directory, the catalog client, the
/// resolver and the before-enqueue hook registry. Changing settings through
/// [`configure`](Self::configure) rebuilds the dependent services.
pub struct LoraScoutApi {
    root: PathBuf,
    state: Arc<ScoutState>,
    hooks: Arc<HookRegistry>,
}

impl LoraScoutApi {
    /// Create a builder for LoraScoutApi.
    pub fn builder(root: impl Into<PathBuf>) -> LoraScoutApiBuilder {
        LoraScoutApiBuilder::new(root)
    }

    /// Create a new LoraScoutApi with default options.
    ///
    /// # Arguments
    ///
    /// * `root` - Existing data directory (holds `settings.json`)
    pub async fn new(root: impl Into<PathBuf>) -> Result<Self> {
        Self::builder(root).build().await
    }

    /// Data root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }
}
