//! Centralized configuration constants for LoRA Scout.
//!
//! Runtime, user-editable settings live in [`crate::settings`]; this module
//! only holds fixed tuning values.

use std::time::Duration;

/// Application-level configuration.
pub struct AppConfig;

impl AppConfig {
    pub const APP_NAME: &'static str = "LoRA Scout";
    pub const APP_CONFIG_DIR_NAME: &'static str = "lora-scout";
    pub const SETTINGS_FILENAME: &'static str = "settings.json";
    pub const USER_AGENT: &'static str = "lora-scout/0.3";
}

/// Network-related configuration.
pub struct NetworkConfig;

impl NetworkConfig {
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
    pub const DOWNLOAD_CONNECT_TIMEOUT: Duration = Duration::from_secs(60);
    pub const DOWNLOAD_PROGRESS_INTERVAL: Duration = Duration::from_millis(500);
    pub const DOWNLOAD_TEMP_SUFFIX: &'static str = ".part";
}

/// Remote catalog (CivitAI) configuration.
pub struct CatalogConfig;

impl CatalogConfig {
    pub const API_BASE: &'static str = "https://civitai.com/api/v1";
    pub const MODEL_TYPE: &'static str = "LORA";
    pub const SORT: &'static str = "Highest Rated";
    /// Results requested per search strategy.
    pub const RESULTS_PER_QUERY: u32 = 10;
    /// Keywords joined for the `keywords` strategy.
    pub const KEYWORD_QUERY_TERMS: usize = 3;
    /// Minimum length for the `first_keyword` strategy to be tried.
    pub const FIRST_KEYWORD_MIN_LEN: usize = 5;
    pub const TOKEN_ENV_VAR: &'static str = "CIVITAI_TOKEN";
    pub const TOKEN_FILENAME: &'static str = "civitai_token";
}

/// Local LoRA file conventions.
pub struct LoraConfig;

impl LoraConfig {
    pub const EXTENSIONS: [&'static str; 3] = [".safetensors", ".ckpt", ".pt"];
    pub const DEFAULT_DIR_NAME: &'static str = "loras";
}
