//! Network operations beyond the catalog API.
//!
//! - Download manager with progress tracking and per-download cancellation

mod download;

pub use download::{ActiveDownload, DownloadManager, DownloadOutcome, DownloadProgress};
