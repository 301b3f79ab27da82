//! Local LoRA directory methods on LoraScoutApi.

use std::path::PathBuf;

use crate::error::Result;
use crate::library::{DirectoryHealth, DuplicateGroup, LoraFileEntry};
use crate::LoraScoutApi;

impl LoraScoutApi {
    /// The active LoRA directory.
    pub async fn lora_dir(&self) -> PathBuf {
        self.state.services().await.directory.path().to_path_buf()
    }

    pub async fn list_loras(&self) -> Result<Vec<LoraFileEntry>> {
        self.state.services().await.directory.list()
    }

    pub async fn check_directory(&self) -> DirectoryHealth {
        self.state.services().await.directory.check()
    }

    pub async fn find_duplicates(&self) -> Result<Vec<DuplicateGroup>> {
        self.state.services().await.directory.find_duplicates()
    }

    /// Whether a LoRA with this name (any extension or case) is present.
    pub async fn lora_exists(&self, name: &str) -> bool {
        self.state.services().await.directory.exists(name)
    }
}
