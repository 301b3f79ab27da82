//! Catalog search and token handlers.

use super::require_str_param;
use crate::server::AppState;
use lora_scout_core::Result;
use serde_json::{json, Value};

pub async fn search_catalog(state: &AppState, params: &Value) -> Result<Value> {
    let name = require_str_param(params, "name", "name")?;
    let pooled = state.api.search_catalog(&name).await;
    Ok(json!({
        "success": true,
        "candidates": pooled.candidates,
        "search_log": pooled.log_lines()
    }))
}

pub async fn find_best_match(state: &AppState, params: &Value) -> Result<Value> {
    let name = require_str_param(params, "name", "name")?;
    let best = state.api.find_best_match(&name).await;
    let mut result = serde_json::to_value(best)?;
    result["success"] = json!(true);
    Ok(result)
}

pub async fn set_civitai_token(state: &AppState, params: &Value) -> Result<Value> {
    let token = require_str_param(params, "token", "token")?;
    let status = state.api.set_civitai_token(&token).await?;
    Ok(json!({
        "success": true,
        "auth": status
    }))
}

pub async fn clear_civitai_token(state: &AppState, _params: &Value) -> Result<Value> {
    let status = state.api.clear_civitai_token().await?;
    Ok(json!({
        "success": true,
        "auth": status
    }))
}

pub async fn get_civitai_auth_status(state: &AppState, _params: &Value) -> Result<Value> {
    let status = state.api.auth_status().await;
    Ok(json!({
        "success": true,
        "auth": status
    }))
}
