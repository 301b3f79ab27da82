//! Name matching methods on LoraScoutApi.

use crate::LoraScoutApi;

impl LoraScoutApi {
    /// Normalize a LoRA name with the configured rules.
    pub async fn normalize(&self, raw: &str) -> String {
        self.state.services().await.matcher.normalize(raw)
    }

    /// Search keywords for a LoRA name with the configured rules.
    pub async fn extract_keywords(&self, raw: &str) -> Vec<String> {
        self.state.services().await.matcher.extract_keywords(raw)
    }

    /// Similarity of two names in `[0, 1]`.
    pub async fn similarity(&self, a: &str, b: &str) -> f64 {
        self.state.services().await.matcher.similarity(a, b)
    }
}
