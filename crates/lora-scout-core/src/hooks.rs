//! Before-enqueue notifications.
//!
//! The host announces each prompt before it is queued for execution;
//! handlers subscribe here instead of wrapping the host's queue. Handler
//! failures are logged and reported, never propagated, so a broken handler
//! cannot stop a prompt from being queued.

use crate::api::state::ScoutState;
use crate::error::Result;
use crate::resolver::{ResolveOptions, ScanReport};
use crate::workflow::extract_lora_references;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

/// A prompt about to be enqueued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnqueueEvent {
    #[serde(default)]
    pub prompt_id: Option<String>,
    /// Prompt-format workflow graph.
    pub prompt: serde_json::Value,
}

/// What a handler did with an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "report", rename_all = "snake_case")]
pub enum HookOutcome {
    Skipped,
    Scanned(ScanReport),
}

/// Receives before-enqueue notifications.
#[async_trait]
pub trait BeforeEnqueueHandler: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    async fn on_before_enqueue(&self, event: &EnqueueEvent) -> Result<HookOutcome>;
}

/// Handle returned by [`HookRegistry::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(u64);

/// Per-handler result of a notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandlerReport {
    pub subscription: SubscriptionId,
    pub handler: String,
    pub outcome: Option<HookOutcome>,
    pub error: Option<String>,
}

/// Ordered set of before-enqueue handlers.
#[derive(Default)]
pub struct HookRegistry {
    next_id: AtomicU64,
    handlers: RwLock<Vec<(SubscriptionId, Arc<dyn BeforeEnqueueHandler>)>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn subscribe(&self, handler: Arc<dyn BeforeEnqueueHandler>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        debug!("Subscribed before-enqueue handler '{}'", handler.name());
        self.handlers.write().await.push((id, handler));
        id
    }

    /// Remove a handler. Returns whether it was subscribed.
    pub async fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers.write().await;
        let before = handlers.len();
        handlers.retain(|(sub, _)| *sub != id);
        handlers.len() != before
    }

    pub async fn len(&self) -> usize {
        self.handlers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.handlers.read().await.is_empty()
    }

    /// Call every handler in subscription order.
    pub async fn notify(&self, event: &EnqueueEvent) -> Vec<HandlerReport> {
        // Snapshot so handlers may (un)subscribe without deadlocking.
        let handlers = self.handlers.read().await.clone();

        let mut reports = Vec::with_capacity(handlers.len());
        for (subscription, handler) in handlers {
            let (outcome, error) = match handler.on_before_enqueue(event).await {
                Ok(outcome) => (Some(outcome), None),
                Err(e) => {
                    error!("Error in before-enqueue handler '{}': {}", handler.name(), e);
                    (None, Some(e.to_string()))
                }
            };
            reports.push(HandlerReport {
                subscription,
                handler: handler.name().to_string(),
                outcome,
                error,
            });
        }
        reports
    }
}

/// Scans enqueued prompts for LoRA references when auto mode is on.
pub struct AutoScanHandler {
    state: Arc<ScoutState>,
}

impl AutoScanHandler {
    pub(crate) fn new(state: Arc<ScoutState>) -> Self {
        Self { state }
    }
}

#[async_trait]
impl BeforeEnqueueHandler for AutoScanHandler {
    fn name(&self) -> &str {
        "auto_scan"
    }

    async fn on_before_enqueue(&self, event: &EnqueueEvent) -> Result<HookOutcome> {
        let settings = self.state.settings.get().await;
        if !settings.auto_mode {
            return Ok(HookOutcome::Skipped);
        }

        let references = extract_lora_references(&event.prompt);
        let options = ResolveOptions {
            auto_download: settings.auto_download,
            check_only: false,
            policy: settings.policy(),
        };
        let report = self.state.resolve(&references, &options).await;

        let downloaded = report.downloaded();
        if !downloaded.is_empty() {
            info!("Auto-downloaded LoRAs: {}", downloaded.join(", "));
        }
        Ok(HookOutcome::Scanned(report))
    }
}
