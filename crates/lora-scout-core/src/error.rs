//! Error types for LoRA Scout.
//!
//! The matching core never fails; these errors come from the I/O collaborators
//! (catalog HTTP calls, downloads, the LoRA directory, settings persistence)
//! and are mapped onto JSON-RPC codes for the host boundary.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the LoRA Scout library.
#[derive(Debug, Error)]
pub enum ScoutError {
    // Network errors
    #[error("Network error: {message}")]
    Network {
        message: String,
        /// Optional cause description
        cause: Option<String>,
    },

    #[error("Request timeout after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Catalog returned HTTP {status} for '{query}'")]
    CatalogStatus { query: String, status: u16 },

    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Path is not a directory: {0}")]
    NotADirectory(PathBuf),

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // Download errors
    #[error("Download failed for {url}: {message}")]
    DownloadFailed { url: String, message: String },

    #[error("Download cancelled")]
    DownloadCancelled,

    // Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    // RPC boundary errors
    #[error("Invalid params: {message}")]
    InvalidParams { message: String },

    #[error("Method not found: {0}")]
    MethodNotFound(String),
}

/// Result type alias for LoRA Scout operations.
pub type Result<T> = std::result::Result<T, ScoutError>;

impl From<std::io::Error> for ScoutError {
    fn from(err: std::io::Error) -> Self {
        ScoutError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for ScoutError {
    fn from(err: serde_json::Error) -> Self {
        ScoutError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<reqwest::Error> for ScoutError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ScoutError::Timeout(std::time::Duration::from_secs(0))
        } else {
            ScoutError::Network {
                message: err.to_string(),
                cause: err.url().map(|u| u.to_string()),
            }
        }
    }
}

impl ScoutError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        ScoutError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Convert to a JSON-RPC error code.
    ///
    /// Standard codes:
    /// - -32601: Method not found
    /// - -32602: Invalid params
    /// - -32603: Internal error
    ///
    /// Application codes:
    /// - -32000: Network/catalog error
    /// - -32003: Download failed
    /// - -32004: Cancelled
    pub fn to_rpc_error_code(&self) -> i32 {
        match self {
            ScoutError::Network { .. }
            | ScoutError::Timeout(_)
            | ScoutError::CatalogStatus { .. } => -32000,

            ScoutError::DownloadFailed { .. } => -32003,

            ScoutError::DownloadCancelled => -32004,

            ScoutError::InvalidParams { .. } => -32602,

            ScoutError::MethodNotFound(_) => -32601,

            _ => -32603,
        }
    }

    /// Check if this error is transient.
    pub fn is_retryable(&self) -> bool {
        match self {
            ScoutError::Network { .. } | ScoutError::Timeout(_) => true,
            ScoutError::CatalogStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ScoutError::CatalogStatus {
            query: "addams".into(),
            status: 503,
        };
        assert_eq!(err.to_string(), "Catalog returned HTTP 503 for 'addams'");
    }

    #[test]
    fn test_rpc_error_codes() {
        assert_eq!(
            ScoutError::MethodNotFound("nope".into()).to_rpc_error_code(),
            -32601
        );
        assert_eq!(
            ScoutError::InvalidParams {
                message: "missing name".into()
            }
            .to_rpc_error_code(),
            -32602
        );
        assert_eq!(ScoutError::DownloadCancelled.to_rpc_error_code(), -32004);
        assert_eq!(
            ScoutError::Config {
                message: "x".into()
            }
            .to_rpc_error_code(),
            -32603
        );
    }

    #[test]
    fn test_retryable_errors() {
        assert!(ScoutError::Timeout(std::time::Duration::from_secs(5)).is_retryable());
        assert!(ScoutError::CatalogStatus {
            query: "q".into(),
            status: 502
        }
        .is_retryable());
        assert!(!ScoutError::CatalogStatus {
            query: "q".into(),
            status: 401
        }
        .is_retryable());
        assert!(!ScoutError::DownloadCancelled.is_retryable());
    }
}
