//! JSON-RPC request handlers, split by domain.

mod catalog;
mod downloads;
mod library;
mod matching;
mod scan;
mod settings;

use crate::server::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use lora_scout_core::{Result, ScoutError};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, error};

// ============================================================================
// JSON-RPC types
// ============================================================================

/// JSON-RPC 2.0 request structure.
#[derive(Debug, Deserialize)]
#[allow(dead_code)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
    pub id: Option<Value>,
}

/// JSON-RPC 2.0 response structure.
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    pub id: Option<Value>,
}

/// JSON-RPC 2.0 error structure.
#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcResponse {
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    pub fn error(id: Option<Value>, code: i32, message: String, data: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: None,
            error: Some(JsonRpcError {
                code,
                message,
                data,
            }),
            id,
        }
    }

    /// Error response for a library error, tagged with whether a retry may help.
    pub fn from_error(id: Option<Value>, err: &ScoutError) -> Self {
        Self::error(
            id,
            err.to_rpc_error_code(),
            err.to_string(),
            Some(json!({"retryable": err.is_retryable()})),
        )
    }
}

// ============================================================================
// Parameter extraction helpers
// ============================================================================

/// Extract an optional string parameter, supporting both snake_case and camelCase.
pub(crate) fn get_str_param<'a>(params: &'a Value, snake: &str, camel: &str) -> Option<&'a str> {
    params
        .get(snake)
        .or_else(|| params.get(camel))
        .and_then(|v| v.as_str())
}

/// Extract a required string parameter or return an error.
pub(crate) fn require_str_param(params: &Value, snake: &str, camel: &str) -> Result<String> {
    get_str_param(params, snake, camel)
        .map(String::from)
        .ok_or_else(|| ScoutError::InvalidParams {
            message: format!("Missing required parameter: {}", snake),
        })
}

/// Extract an optional bool parameter, supporting both snake_case and camelCase.
pub(crate) fn get_bool_param(params: &Value, snake: &str, camel: &str) -> Option<bool> {
    params
        .get(snake)
        .or_else(|| params.get(camel))
        .and_then(|v| v.as_bool())
}

/// Extract an optional f64 parameter, supporting both snake_case and camelCase.
pub(crate) fn get_f64_param(params: &Value, snake: &str, camel: &str) -> Option<f64> {
    params
        .get(snake)
        .or_else(|| params.get(camel))
        .and_then(|v| v.as_f64())
}

/// Deserialize the whole params object into `T`.
pub(crate) fn parse_params<T: serde::de::DeserializeOwned>(params: &Value) -> Result<T> {
    serde_json::from_value(params.clone()).map_err(|e| ScoutError::InvalidParams {
        message: format!("Invalid params: {}", e),
    })
}

// ============================================================================
// HTTP endpoints
// ============================================================================

/// Health check endpoint.
pub async fn handle_health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

/// Main JSON-RPC handler.
pub async fn handle_rpc(
    State(state): State<Arc<AppState>>,
    Json(request): Json<JsonRpcRequest>,
) -> impl IntoResponse {
    let method = &request.method;
    let params = request.params.unwrap_or(Value::Object(Default::default()));
    let id = request.id.clone();

    debug!("RPC call: {}({:?})", method, params);

    // Handle built-in methods
    if method == "health_check" {
        return (
            StatusCode::OK,
            Json(JsonRpcResponse::success(
                id,
                json!({"status": "ok", "version": env!("CARGO_PKG_VERSION")}),
            )),
        );
    }

    match dispatch_method(&state, method, &params).await {
        Ok(value) => (StatusCode::OK, Json(JsonRpcResponse::success(id, value))),
        Err(e) => {
            error!("RPC error for {}: {}", method, e);
            (StatusCode::OK, Json(JsonRpcResponse::from_error(id, &e)))
        }
    }
}

// ============================================================================
// Method dispatcher
// ============================================================================

/// Dispatch a method call to the appropriate domain handler.
async fn dispatch_method(state: &AppState, method: &str, params: &Value) -> Result<Value> {
    match method {
        // Name matching
        "normalize_name" => matching::normalize_name(state, params).await,
        "extract_keywords" => matching::extract_keywords(state, params).await,
        "name_similarity" => matching::name_similarity(state, params).await,

        // Catalog
        "search_catalog" => catalog::search_catalog(state, params).await,
        "find_best_match" => catalog::find_best_match(state, params).await,
        "set_civitai_token" => catalog::set_civitai_token(state, params).await,
        "clear_civitai_token" => catalog::clear_civitai_token(state, params).await,
        "get_civitai_auth_status" => catalog::get_civitai_auth_status(state, params).await,

        // Workflow scanning
        "scan_workflow" => scan::scan_workflow(state, params).await,
        "before_enqueue" => scan::before_enqueue(state, params).await,
        "missing_from_error" => scan::missing_from_error(state, params).await,

        // Settings
        "configure" => settings::configure(state, params).await,
        "get_settings" => settings::get_settings(state, params).await,

        // LoRA directory
        "list_loras" => library::list_loras(state, params).await,
        "check_directory" => library::check_directory(state, params).await,
        "find_duplicates" => library::find_duplicates(state, params).await,
        "lora_exists" => library::lora_exists(state, params).await,

        // Downloads
        "list_downloads" => downloads::list_downloads(state, params).await,
        "cancel_download" => downloads::cancel_download(state, params).await,

        _ => Err(ScoutError::MethodNotFound(method.to_string())),
    }
}
