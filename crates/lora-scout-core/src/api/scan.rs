//! Workflow scanning and before-enqueue methods on LoraScoutApi.

use serde_json::Value;
use std::sync::Arc;

use crate::hooks::{BeforeEnqueueHandler, EnqueueEvent, HandlerReport, SubscriptionId};
use crate::resolver::{ResolveOptions, ScanReport};
use crate::workflow::{self, LoraReference};
use crate::LoraScoutApi;

impl LoraScoutApi {
    /// Resolve options derived from the current settings.
    pub async fn default_scan_options(&self) -> ResolveOptions {
        let settings = self.state.settings.get().await;
        ResolveOptions {
            auto_download: settings.auto_download,
            check_only: false,
            policy: settings.policy(),
        }
    }

    /// Scan a prompt-format workflow and resolve its LoRA references.
    ///
    /// `options` defaults to [`default_scan_options`](Self::default_scan_options).
    pub async fn scan_workflow(
        &self,
        workflow: &Value,
        options: Option<ResolveOptions>,
    ) -> ScanReport {
        let references = workflow::extract_lora_references(workflow);
        self.resolve_references(&references, options).await
    }

    /// Like [`scan_workflow`](Self::scan_workflow) for JSON text.
    ///
    /// Unparseable text scans as an empty workflow.
    pub async fn scan_workflow_text(
        &self,
        text: &str,
        options: Option<ResolveOptions>,
    ) -> ScanReport {
        let references = workflow::parse_workflow(text);
        self.resolve_references(&references, options).await
    }

    /// LoRA names the host rejected in a validation error message.
    pub fn missing_from_error(&self, message: &str) -> Vec<String> {
        workflow::missing_loras_from_error(message)
    }

    /// Resolve the LoRAs named in a host validation error.
    pub async fn resolve_from_error(
        &self,
        message: &str,
        options: Option<ResolveOptions>,
    ) -> ScanReport {
        let references: Vec<LoraReference> = workflow::missing_loras_from_error(message)
            .into_iter()
            .map(|name| LoraReference {
                name,
                node_id: String::new(),
                class_type: String::new(),
                strength_model: 1.0,
                strength_clip: 1.0,
                model_version_id: None,
            })
            .collect();
        self.resolve_references(&references, options).await
    }

    async fn resolve_references(
        &self,
        references: &[LoraReference],
        options: Option<ResolveOptions>,
    ) -> ScanReport {
        let options = match options {
            Some(options) => options,
            None => self.default_scan_options().await,
        };
        self.state.resolve(references, &options).await
    }

    // ========================================
    // Before-enqueue hooks
    // ========================================

    /// Announce a prompt that is about to be enqueued.
    pub async fn before_enqueue(&self, event: &EnqueueEvent) -> Vec<HandlerReport> {
        self.hooks.notify(event).await
    }

    pub async fn subscribe(&self, handler: Arc<dyn BeforeEnqueueHandler>) -> SubscriptionId {
        self.hooks.subscribe(handler).await
    }

    pub async fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.hooks.unsubscribe(id).await
    }
}
