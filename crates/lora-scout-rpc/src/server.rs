//! HTTP server implementation using Axum.

use crate::handlers::{handle_health, handle_rpc};
use axum::{
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use lora_scout_core::LoraScoutApi;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Concurrent RPC requests; scans may hold a request open for a download.
const MAX_CONCURRENT_REQUESTS: usize = 32;

/// Application state shared across handlers.
pub struct AppState {
    /// Core API (matching, catalog, directory, settings, hooks)
    pub api: LoraScoutApi,
}

/// Build the router for a shared state.
pub fn router(state: Arc<AppState>) -> Router {
    // The host UI runs on another port of this machine. Other sites must not
    // be able to reconfigure the catalog or trigger downloads.
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(|origin: &HeaderValue, _| {
            origin.to_str().is_ok_and(is_local_origin)
        }))
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/rpc", post(handle_rpc))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(ConcurrencyLimitLayer::new(MAX_CONCURRENT_REQUESTS))
        .with_state(state)
}

/// Whether a browser origin (`scheme://host[:port]`) is a loopback host.
fn is_local_origin(origin: &str) -> bool {
    let Some((scheme, rest)) = origin.split_once("://") else {
        return false;
    };
    if !matches!(scheme, "http" | "https") {
        return false;
    }

    let host = match rest.strip_prefix('[') {
        Some(v6) => v6.split(']').next().unwrap_or_default(),
        None => rest.split(':').next().unwrap_or_default(),
    };
    matches!(host, "localhost" | "127.0.0.1" | "::1")
}

/// Start the JSON-RPC HTTP server.
///
/// Returns the actual address the server is bound to (useful when port=0).
pub async fn start_server(api: LoraScoutApi, host: &str, port: u16) -> anyhow::Result<SocketAddr> {
    let state = Arc::new(AppState { api });
    let app = router(state);

    // Parse the address
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;

    // Bind to the address
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    info!("Server listening on {}", actual_addr);

    // Spawn the server in the background
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Server error: {}", e);
        }
    });

    Ok(actual_addr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_server_starts() {
        let temp_dir = TempDir::new().unwrap();
        let api = LoraScoutApi::builder(temp_dir.path())
            .config_dir(temp_dir.path().join("config"))
            .build()
            .await
            .unwrap();

        let addr = start_server(api, "127.0.0.1", 0).await.unwrap();
        assert!(addr.port() > 0);
    }

    #[test]
    fn test_local_origins() {
        assert!(is_local_origin("http://127.0.0.1:8188"));
        assert!(is_local_origin("http://localhost:8188"));
        assert!(is_local_origin("https://localhost"));
        assert!(is_local_origin("http://[::1]:8188"));

        assert!(!is_local_origin("https://evil.example"));
        assert!(!is_local_origin("http://localhost.evil.example"));
        assert!(!is_local_origin("http://127.0.0.1.nip.io:8188"));
        assert!(!is_local_origin("file://localhost"));
        assert!(!is_local_origin("null"));
    }
}
