//! Settings handlers.

use super::parse_params;
use crate::server::AppState;
use lora_scout_core::{Result, SettingsUpdate};
use serde_json::{json, Value};

pub async fn configure(state: &AppState, params: &Value) -> Result<Value> {
    let update: SettingsUpdate = parse_params(params)?;
    let view = state.api.configure(update).await?;
    Ok(json!({
        "success": true,
        "settings": view
    }))
}

pub async fn get_settings(state: &AppState, _params: &Value) -> Result<Value> {
    Ok(json!({
        "success": true,
        "settings": state.api.settings().await
    }))
}
