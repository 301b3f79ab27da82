//! Name matching handlers.

use super::require_str_param;
use crate::server::AppState;
use lora_scout_core::Result;
use serde_json::{json, Value};

pub async fn normalize_name(state: &AppState, params: &Value) -> Result<Value> {
    let name = require_str_param(params, "name", "name")?;
    let normalized = state.api.normalize(&name).await;
    Ok(json!({
        "success": true,
        "normalized": normalized
    }))
}

pub async fn extract_keywords(state: &AppState, params: &Value) -> Result<Value> {
    let name = require_str_param(params, "name", "name")?;
    let keywords = state.api.extract_keywords(&name).await;
    Ok(json!({
        "success": true,
        "keywords": keywords
    }))
}

pub async fn name_similarity(state: &AppState, params: &Value) -> Result<Value> {
    let a = require_str_param(params, "a", "a")?;
    let b = require_str_param(params, "b", "b")?;
    let score = state.api.similarity(&a, &b).await;
    Ok(json!({
        "success": true,
        "score": score
    }))
}
