//! Download tracking methods on LoraScoutApi.

use crate::network::ActiveDownload;
use crate::LoraScoutApi;

impl LoraScoutApi {
    /// Downloads started by scans that are still streaming.
    pub async fn active_downloads(&self) -> Vec<ActiveDownload> {
        self.state.downloads.active_downloads().await
    }

    /// Cancel a running download by its destination file name.
    ///
    /// The scan that started it reports the LoRA as failed. Returns `false`
    /// when nothing with that name is downloading.
    pub async fn cancel_download(&self, file_name: &str) -> bool {
        self.state.downloads.cancel_download(file_name).await
    }
}
