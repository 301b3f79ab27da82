//! End-to-end resolution of workflow LoRA references.
//!
//! For every distinct LoRA name: check the local directory, and when the
//! file is missing, search the catalog, select the best candidate and
//! download its primary file. A failure for one name never aborts the scan.

use crate::catalog::{search_with_strategies, CatalogModel, CatalogSource};
use crate::library::{sanitize_filename, LoraDirectory};
use crate::matching::{AcceptancePolicy, NameMatcher};
use crate::network::{DownloadManager, DownloadOutcome, DownloadProgress};
use crate::workflow::LoraReference;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// What a scan is allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResolveOptions {
    pub auto_download: bool,
    /// Report only; never search or download.
    pub check_only: bool,
    pub policy: AcceptancePolicy,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            auto_download: true,
            check_only: false,
            policy: AcceptancePolicy::ENHANCED,
        }
    }
}

impl ResolveOptions {
    fn downloads_enabled(&self) -> bool {
        self.auto_download && !self.check_only
    }
}

/// Result for one LoRA name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ResolveOutcome {
    Found {
        path: PathBuf,
    },
    /// Missing, and downloading was not requested.
    Missing,
    Downloaded {
        file_name: String,
        model_name: String,
        score: f64,
    },
    /// The matched file was already on disk under its catalog name.
    AlreadyExists {
        file_name: String,
    },
    NoConfidentMatch {
        best_name: Option<String>,
        score: f64,
    },
    NoCandidates,
    TokenRequired,
    Failed {
        reason: String,
    },
}

impl ResolveOutcome {
    /// Whether the file was absent when the scan looked for it.
    pub fn was_missing(&self) -> bool {
        !matches!(self, ResolveOutcome::Found { .. })
    }

    /// Whether the file is available after the scan.
    pub fn is_available(&self) -> bool {
        matches!(
            self,
            ResolveOutcome::Found { .. }
                | ResolveOutcome::Downloaded { .. }
                | ResolveOutcome::AlreadyExists { .. }
        )
    }
}

/// One resolved LoRA name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolveEntry {
    pub name: String,
    /// Nodes referencing this name.
    pub node_ids: Vec<String>,
    pub outcome: ResolveOutcome,
    /// Rendered strategy log of the catalog search, if one ran.
    pub search_log: Vec<String>,
}

/// Result of scanning one workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    pub scanned_at: DateTime<Utc>,
    pub lora_dir: PathBuf,
    pub total_references: usize,
    pub entries: Vec<ResolveEntry>,
}

impl ScanReport {
    /// Names that were not on disk when scanned.
    pub fn missing(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.outcome.was_missing())
            .map(|e| e.name.as_str())
            .collect()
    }

    /// Names that were downloaded during the scan.
    pub fn downloaded(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| matches!(e.outcome, ResolveOutcome::Downloaded { .. }))
            .map(|e| e.name.as_str())
            .collect()
    }

    /// Names still unavailable after the scan.
    pub fn unresolved(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| !e.outcome.is_available())
            .map(|e| e.name.as_str())
            .collect()
    }

    /// Human-readable status report.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "LoRA directory: {}", self.lora_dir.display());
        let _ = writeln!(
            out,
            "Found {} LoRA reference(s), {} unique",
            self.total_references,
            self.entries.len()
        );

        for entry in &self.entries {
            let line = match &entry.outcome {
                ResolveOutcome::Found { .. } => {
                    let _ = writeln!(out, "✓ Found: {}", entry.name);
                    continue;
                }
                ResolveOutcome::Missing => String::new(),
                ResolveOutcome::Downloaded {
                    file_name,
                    model_name,
                    score,
                } => format!(
                    "  ✓ Downloaded {} from '{}' (similarity {:.2})",
                    file_name, model_name, score
                ),
                ResolveOutcome::AlreadyExists { file_name } => {
                    format!("  ✓ File already exists: {}", file_name)
                }
                ResolveOutcome::NoConfidentMatch { best_name, score } => match best_name {
                    Some(best) => format!(
                        "  ✗ No confident match (best '{}', similarity {:.2})",
                        best, score
                    ),
                    None => "  ✗ No confident match".to_string(),
                },
                ResolveOutcome::NoCandidates => "  ✗ No matching LoRAs found on CivitAI".into(),
                ResolveOutcome::TokenRequired => "  ⚠ CivitAI token required for download".into(),
                ResolveOutcome::Failed { reason } => format!("  ✗ {}", reason),
            };

            let _ = writeln!(out, "✗ Missing: {}", entry.name);
            for query in &entry.search_log {
                let _ = writeln!(out, "    {}", query);
            }
            if !line.is_empty() {
                let _ = writeln!(out, "{}", line);
            }
        }

        let unresolved = self.unresolved().len();
        if unresolved > 0 {
            let _ = write!(out, "⚠ {} LoRA(s) are missing", unresolved);
        } else {
            let _ = write!(out, "✓ All LoRAs are available");
        }
        out
    }
}

/// Distinct names in first-seen order, with the nodes using each.
fn group_by_name(references: &[LoraReference]) -> Vec<(String, Vec<String>)> {
    let mut groups: Vec<(String, Vec<String>)> = Vec::new();
    for reference in references {
        match groups.iter_mut().find(|(name, _)| *name == reference.name) {
            Some((_, nodes)) => nodes.push(reference.node_id.clone()),
            None => groups.push((reference.name.clone(), vec![reference.node_id.clone()])),
        }
    }
    groups
}

/// Resolves LoRA references against the local directory and the catalog.
pub struct LoraResolver {
    directory: LoraDirectory,
    catalog: Arc<dyn CatalogSource>,
    matcher: NameMatcher,
    downloads: Arc<DownloadManager>,
}

impl LoraResolver {
    pub fn new(
        directory: LoraDirectory,
        catalog: Arc<dyn CatalogSource>,
        matcher: NameMatcher,
        downloads: Arc<DownloadManager>,
    ) -> Self {
        Self {
            directory,
            catalog,
            matcher,
            downloads,
        }
    }

    pub fn directory(&self) -> &LoraDirectory {
        &self.directory
    }

    /// Resolve every distinct referenced name.
    ///
    /// `token` authorizes catalog downloads; without one, missing files are
    /// reported as [`ResolveOutcome::TokenRequired`] when downloading is on.
    pub async fn resolve(
        &self,
        references: &[LoraReference],
        options: &ResolveOptions,
        token: Option<&str>,
    ) -> ScanReport {
        let mut entries = Vec::new();

        for (name, node_ids) in group_by_name(references) {
            let mut search_log = Vec::new();
            let outcome = self
                .resolve_one(&name, options, token, &mut search_log)
                .await;
            info!("LoRA '{}': {:?}", name, outcome);
            entries.push(ResolveEntry {
                name,
                node_ids,
                outcome,
                search_log,
            });
        }

        ScanReport {
            scanned_at: Utc::now(),
            lora_dir: self.directory.path().to_path_buf(),
            total_references: references.len(),
            entries,
        }
    }

    async fn resolve_one(
        &self,
        name: &str,
        options: &ResolveOptions,
        token: Option<&str>,
        search_log: &mut Vec<String>,
    ) -> ResolveOutcome {
        if let Some(path) = self.directory.locate(name) {
            return ResolveOutcome::Found { path };
        }
        if !options.downloads_enabled() {
            return ResolveOutcome::Missing;
        }
        let Some(token) = token.filter(|t| !t.is_empty()) else {
            return ResolveOutcome::TokenRequired;
        };

        let pooled = search_with_strategies(self.catalog.as_ref(), name, &self.matcher).await;
        search_log.extend(pooled.log_lines());
        if pooled.candidates.is_empty() {
            return ResolveOutcome::NoCandidates;
        }

        let result = self.matcher.select_best(name, &pooled.candidates);
        let candidate = match result.candidate {
            Some(candidate) if options.policy.accepts(result.score) => candidate,
            other => {
                return ResolveOutcome::NoConfidentMatch {
                    best_name: other.map(|c| c.name),
                    score: result.score,
                }
            }
        };

        self.download_candidate(name, &candidate, result.score, token)
            .await
    }

    async fn download_candidate(
        &self,
        name: &str,
        candidate: &CatalogModel,
        score: f64,
        token: &str,
    ) -> ResolveOutcome {
        let Some(file) = candidate.primary_file() else {
            return ResolveOutcome::Failed {
                reason: "No downloadable file found".into(),
            };
        };
        let Some(url) = file.download_url.as_deref().filter(|u| !u.is_empty()) else {
            return ResolveOutcome::Failed {
                reason: "No download URL available".into(),
            };
        };

        let file_name = if file.name.is_empty() {
            sanitize_filename(&format!("{}.safetensors", name))
        } else {
            sanitize_filename(&file.name)
        };

        if let Err(e) = self.directory.ensure_exists() {
            return ResolveOutcome::Failed {
                reason: format!("Download error: {}", e),
            };
        }

        let destination = self.directory.file_path(&file_name);
        let (progress_tx, mut progress_rx) = mpsc::channel(16);
        let log_progress = async {
            while let Some(progress) = progress_rx.recv().await {
                log_download_progress(&file_name, &progress);
            }
        };
        let (result, ()) = tokio::join!(
            self.downloads
                .download(url, &destination, Some(token), Some(progress_tx)),
            log_progress
        );

        match result {
            Ok(DownloadOutcome::Completed { .. }) => ResolveOutcome::Downloaded {
                file_name,
                model_name: candidate.name.clone(),
                score,
            },
            Ok(DownloadOutcome::AlreadyExists) => ResolveOutcome::AlreadyExists { file_name },
            Err(e) => {
                warn!("Download of '{}' failed: {}", name, e);
                ResolveOutcome::Failed {
                    reason: format!("Download error: {}", e),
                }
            }
        }
    }
}

fn log_download_progress(file_name: &str, progress: &DownloadProgress) {
    let mb = progress.bytes_downloaded as f64 / (1024.0 * 1024.0);
    match progress.percent {
        Some(percent) => info!("Downloading {}: {:.1} MB ({:.1}%)", file_name, mb, percent),
        None => info!("Downloading {}: {:.1} MB", file_name, mb),
    }
}
