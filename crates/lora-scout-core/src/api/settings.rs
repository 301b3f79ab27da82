//! Settings methods on LoraScoutApi.

use crate::error::Result;
use crate::settings::{SettingsUpdate, SettingsView};
use crate::LoraScoutApi;

impl LoraScoutApi {
    /// Current settings, without the token.
    pub async fn settings(&self) -> SettingsView {
        let mut view = self.state.settings.view().await;
        view.lora_dir = self.lora_dir().await;
        if let Some(base) = &self.state.catalog_base_override {
            view.catalog_base_url = base.clone();
        }
        view.has_civitai_token = self.auth_status().await.has_token;
        view
    }

    /// Apply a settings update and rebuild the services that depend on it.
    pub async fn configure(&self, update: SettingsUpdate) -> Result<SettingsView> {
        self.state.settings.update(update).await?;
        self.state.rebuild().await?;
        Ok(self.settings().await)
    }
}
