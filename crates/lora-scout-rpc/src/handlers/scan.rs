//! Workflow scanning and before-enqueue handlers.

use super::{get_bool_param, get_f64_param, get_str_param, parse_params};
use crate::server::AppState;
use lora_scout_core::{AcceptancePolicy, EnqueueEvent, ResolveOptions, Result, ScoutError};
use serde_json::{json, Value};

/// Scan options: settings defaults with per-call overrides.
async fn scan_options(state: &AppState, params: &Value) -> ResolveOptions {
    let mut options = state.api.default_scan_options().await;
    if let Some(check_only) = get_bool_param(params, "check_only", "checkOnly") {
        options.check_only = check_only;
    }
    if let Some(auto_download) = get_bool_param(params, "auto_download", "autoDownload") {
        options.auto_download = auto_download;
    }
    if let Some(min_score) = get_f64_param(params, "min_score", "minScore") {
        options.policy = AcceptancePolicy::new(min_score);
    }
    options
}

pub async fn scan_workflow(state: &AppState, params: &Value) -> Result<Value> {
    let options = scan_options(state, params).await;
    let report = match params.get("workflow") {
        Some(Value::String(text)) => state.api.scan_workflow_text(text, Some(options)).await,
        Some(workflow @ Value::Object(_)) => state.api.scan_workflow(workflow, Some(options)).await,
        _ => {
            return Err(ScoutError::InvalidParams {
                message: "Missing required parameter: workflow".to_string(),
            })
        }
    };

    Ok(json!({
        "success": true,
        "missing": report.missing(),
        "downloaded": report.downloaded(),
        "text": report.render(),
        "report": report
    }))
}

pub async fn before_enqueue(state: &AppState, params: &Value) -> Result<Value> {
    let event: EnqueueEvent = parse_params(params)?;
    let handlers = state.api.before_enqueue(&event).await;
    Ok(json!({
        "success": true,
        "handlers": handlers
    }))
}

pub async fn missing_from_error(state: &AppState, params: &Value) -> Result<Value> {
    let message = get_str_param(params, "message", "message").ok_or_else(|| {
        ScoutError::InvalidParams {
            message: "Missing required parameter: message".to_string(),
        }
    })?;

    let missing = state.api.missing_from_error(message);
    if !get_bool_param(params, "resolve", "resolve").unwrap_or(false) {
        return Ok(json!({
            "success": true,
            "missing": missing
        }));
    }

    let options = scan_options(state, params).await;
    let report = state.api.resolve_from_error(message, Some(options)).await;
    Ok(json!({
        "success": true,
        "missing": missing,
        "report": report
    }))
}
