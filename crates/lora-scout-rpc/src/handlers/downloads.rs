//! Download tracking handlers.

use super::require_str_param;
use crate::server::AppState;
use lora_scout_core::Result;
use serde_json::{json, Value};

pub async fn list_downloads(state: &AppState, _params: &Value) -> Result<Value> {
    let downloads = state.api.active_downloads().await;
    Ok(json!({
        "success": true,
        "downloads": downloads
    }))
}

pub async fn cancel_download(state: &AppState, params: &Value) -> Result<Value> {
    let file_name = require_str_param(params, "file_name", "fileName")?;
    let cancelled = state.api.cancel_download(&file_name).await;
    Ok(json!({
        "success": true,
        "cancelled": cancelled
    }))
}
