//! Streamed file download with progress reporting and cancellation.
//!
//! Bytes are written to `<destination>.part` and renamed into place only
//! after the stream completes, so a failed or cancelled download never
//! leaves a truncated LoRA file behind. There is no retry.

use crate::config::{AppConfig, NetworkConfig};
use crate::error::{Result, ScoutError};
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info};

/// Progress information for a download.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadProgress {
    pub bytes_downloaded: u64,
    /// Total bytes, when the server sent a content length.
    pub total_bytes: Option<u64>,
    /// Percentage complete (0-100).
    pub percent: Option<f64>,
    /// Average speed in bytes per second.
    pub speed_bytes_per_sec: f64,
    /// Estimated time remaining in seconds.
    pub eta_seconds: Option<f64>,
}

impl DownloadProgress {
    fn new(bytes_downloaded: u64, total_bytes: Option<u64>, speed: f64) -> Self {
        let percent = total_bytes.map(|total| {
            if total > 0 {
                (bytes_downloaded as f64 / total as f64) * 100.0
            } else {
                0.0
            }
        });

        let eta_seconds = total_bytes.and_then(|total| {
            (speed > 0.0 && bytes_downloaded < total)
                .then(|| (total - bytes_downloaded) as f64 / speed)
        });

        Self {
            bytes_downloaded,
            total_bytes,
            percent,
            speed_bytes_per_sec: speed,
            eta_seconds,
        }
    }
}

/// Result of a download request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DownloadOutcome {
    Completed { bytes: u64 },
    /// The destination was already present; nothing was fetched.
    AlreadyExists,
}

/// A download that is currently streaming.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveDownload {
    /// Destination file name; also the id used to cancel.
    pub file_name: String,
    pub url: String,
    pub progress: DownloadProgress,
}

struct DownloadState {
    info: ActiveDownload,
    cancel_flag: Arc<AtomicBool>,
}

/// Download manager for LoRA files.
///
/// Every download registers under its destination file name with its own
/// cancel flag, so cancelling one never touches the others.
pub struct DownloadManager {
    /// Connect timeout only; a total timeout would kill large downloads.
    client: Client,
    downloads: RwLock<HashMap<String, DownloadState>>,
    progress_interval: Duration,
}

impl std::fmt::Debug for DownloadManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadManager")
            .field("progress_interval", &self.progress_interval)
            .finish_non_exhaustive()
    }
}

impl DownloadManager {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(NetworkConfig::DOWNLOAD_CONNECT_TIMEOUT)
            .user_agent(AppConfig::USER_AGENT)
            .build()
            .map_err(|e| ScoutError::Network {
                message: format!("Failed to create download HTTP client: {}", e),
                cause: None,
            })?;

        Ok(Self {
            client,
            downloads: RwLock::new(HashMap::new()),
            progress_interval: NetworkConfig::DOWNLOAD_PROGRESS_INTERVAL,
        })
    }

    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Cancel a download by destination file name.
    ///
    /// Returns `false` if no such download is running.
    pub async fn cancel_download(&self, file_name: &str) -> bool {
        let downloads = self.downloads.read().await;
        match downloads.get(file_name) {
            Some(state) => {
                state.cancel_flag.store(true, Ordering::SeqCst);
                info!("Cancelling download of {}", file_name);
                true
            }
            None => false,
        }
    }

    /// Downloads currently streaming, sorted by file name.
    pub async fn active_downloads(&self) -> Vec<ActiveDownload> {
        let downloads = self.downloads.read().await;
        let mut active: Vec<_> = downloads.values().map(|s| s.info.clone()).collect();
        active.sort_by(|a, b| a.file_name.cmp(&b.file_name));
        active
    }

    /// Download `url` to `destination`.
    ///
    /// # Arguments
    ///
    /// * `url` - Absolute http(s) URL
    /// * `destination` - Final file path; parent directories are created
    /// * `token` - Optional bearer token sent with the request
    /// * `progress_tx` - Optional channel for progress updates
    pub async fn download(
        &self,
        url: &str,
        destination: &Path,
        token: Option<&str>,
        progress_tx: Option<mpsc::Sender<DownloadProgress>>,
    ) -> Result<DownloadOutcome> {
        let parsed = url::Url::parse(url).map_err(|e| ScoutError::DownloadFailed {
            url: url.to_string(),
            message: format!("Invalid URL: {}", e),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ScoutError::DownloadFailed {
                url: url.to_string(),
                message: format!("Unsupported URL scheme '{}'", parsed.scheme()),
            });
        }

        if destination.exists() {
            debug!("Skipping download, {} exists", destination.display());
            return Ok(DownloadOutcome::AlreadyExists);
        }

        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ScoutError::io_with_path(e, parent))?;
        }

        let file_name = destination
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| ScoutError::DownloadFailed {
                url: url.to_string(),
                message: format!("Destination has no file name: {}", destination.display()),
            })?;
        let cancel_flag = self.register(&file_name, url).await?;

        let temp_path = temp_path_for(destination);
        let result = self
            .do_download(parsed, &file_name, &temp_path, token, &cancel_flag, progress_tx)
            .await
            .and_then(|bytes| {
                // A cancel that lands after the last chunk still wins.
                if cancel_flag.load(Ordering::SeqCst) {
                    Err(ScoutError::DownloadCancelled)
                } else {
                    Ok(bytes)
                }
            });
        self.downloads.write().await.remove(&file_name);

        match result {
            Ok(bytes) => {
                tokio::fs::rename(&temp_path, destination)
                    .await
                    .map_err(|e| {
                        let _ = std::fs::remove_file(&temp_path);
                        ScoutError::Io {
                            message: format!("Failed to move download into place: {}", e),
                            path: Some(destination.to_path_buf()),
                            source: Some(e),
                        }
                    })?;
                info!("Downloaded {} bytes to {}", bytes, destination.display());
                Ok(DownloadOutcome::Completed { bytes })
            }
            Err(e) => {
                let _ = tokio::fs::remove_file(&temp_path).await;
                Err(e)
            }
        }
    }

    async fn register(&self, file_name: &str, url: &str) -> Result<Arc<AtomicBool>> {
        let mut downloads = self.downloads.write().await;
        if downloads.contains_key(file_name) {
            return Err(ScoutError::DownloadFailed {
                url: url.to_string(),
                message: format!("{} is already downloading", file_name),
            });
        }

        let cancel_flag = Arc::new(AtomicBool::new(false));
        downloads.insert(
            file_name.to_string(),
            DownloadState {
                info: ActiveDownload {
                    file_name: file_name.to_string(),
                    url: url.to_string(),
                    progress: DownloadProgress::new(0, None, 0.0),
                },
                cancel_flag: cancel_flag.clone(),
            },
        );
        Ok(cancel_flag)
    }

    /// Record progress on the registry entry and forward it to the caller.
    async fn report(
        &self,
        file_name: &str,
        progress: DownloadProgress,
        progress_tx: Option<&mpsc::Sender<DownloadProgress>>,
    ) {
        if let Some(state) = self.downloads.write().await.get_mut(file_name) {
            state.info.progress = progress.clone();
        }
        if let Some(tx) = progress_tx {
            let _ = tx.send(progress).await;
        }
    }

    async fn do_download(
        &self,
        url: url::Url,
        file_name: &str,
        temp_path: &Path,
        token: Option<&str>,
        cancel_flag: &AtomicBool,
        progress_tx: Option<mpsc::Sender<DownloadProgress>>,
    ) -> Result<u64> {
        let url_str = url.to_string();
        let mut request = self.client.get(url);
        if let Some(token) = token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }

        let response = request.send().await.map_err(|e| ScoutError::Network {
            message: format!("Download request failed: {}", e),
            cause: Some(e.to_string()),
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScoutError::DownloadFailed {
                url: url_str,
                message: format!("Download failed with status {}", status),
            });
        }

        let total_bytes = response.content_length();
        let mut file = tokio::fs::File::create(temp_path)
            .await
            .map_err(|e| ScoutError::io_with_path(e, temp_path))?;

        let mut bytes_downloaded: u64 = 0;
        let mut last_progress_update = Instant::now();
        let speed_tracker = SpeedTracker::new();
        let mut stream = response.bytes_stream();

        self.report(
            file_name,
            DownloadProgress::new(0, total_bytes, 0.0),
            progress_tx.as_ref(),
        )
        .await;

        while let Some(chunk) = stream.next().await {
            if cancel_flag.load(Ordering::SeqCst) {
                return Err(ScoutError::DownloadCancelled);
            }

            let chunk = chunk.map_err(|e| ScoutError::Network {
                message: format!("Error reading download stream: {}", e),
                cause: Some(url_str.clone()),
            })?;

            file.write_all(&chunk)
                .await
                .map_err(|e| ScoutError::io_with_path(e, temp_path))?;
            bytes_downloaded += chunk.len() as u64;

            if last_progress_update.elapsed() >= self.progress_interval {
                let speed = speed_tracker.speed(bytes_downloaded);
                let progress = DownloadProgress::new(bytes_downloaded, total_bytes, speed);
                self.report(file_name, progress, progress_tx.as_ref()).await;
                last_progress_update = Instant::now();
            }
        }

        file.flush()
            .await
            .map_err(|e| ScoutError::io_with_path(e, temp_path))?;
        file.sync_all()
            .await
            .map_err(|e| ScoutError::io_with_path(e, temp_path))?;

        let speed = speed_tracker.speed(bytes_downloaded);
        self.report(
            file_name,
            DownloadProgress::new(bytes_downloaded, total_bytes, speed),
            progress_tx.as_ref(),
        )
        .await;

        Ok(bytes_downloaded)
    }
}

/// `<destination>.part`
fn temp_path_for(destination: &Path) -> PathBuf {
    let mut name = destination.as_os_str().to_owned();
    name.push(NetworkConfig::DOWNLOAD_TEMP_SUFFIX);
    PathBuf::from(name)
}

/// Average speed since the download started.
struct SpeedTracker {
    start_time: Instant,
}

impl SpeedTracker {
    fn new() -> Self {
        Self {
            start_time: Instant::now(),
        }
    }

    fn speed(&self, total_bytes: u64) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            total_bytes as f64 / elapsed
        } else {
            0.0
        }
    }
}
