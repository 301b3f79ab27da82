//! LoRA directory handlers.

use super::require_str_param;
use crate::server::AppState;
use lora_scout_core::Result;
use serde_json::{json, Value};

pub async fn list_loras(state: &AppState, _params: &Value) -> Result<Value> {
    let loras = state.api.list_loras().await?;
    Ok(json!({
        "success": true,
        "lora_dir": state.api.lora_dir().await,
        "count": loras.len(),
        "loras": loras
    }))
}

pub async fn check_directory(state: &AppState, _params: &Value) -> Result<Value> {
    let health = state.api.check_directory().await;
    Ok(json!({
        "success": true,
        "health": health
    }))
}

pub async fn find_duplicates(state: &AppState, _params: &Value) -> Result<Value> {
    let duplicates = state.api.find_duplicates().await?;
    Ok(json!({
        "success": true,
        "duplicates": duplicates
    }))
}

pub async fn lora_exists(state: &AppState, params: &Value) -> Result<Value> {
    let name = require_str_param(params, "name", "name")?;
    Ok(json!({
        "success": true,
        "exists": state.api.lora_exists(&name).await
    }))
}
