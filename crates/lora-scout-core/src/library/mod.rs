//! Local LoRA directory.
//!
//! Existence checks, listing, health and duplicate detection for the
//! directory the host loads LoRA files from.

mod naming;

pub use naming::{has_lora_extension, sanitize_filename, strip_lora_extensions};

use crate::config::LoraConfig;
use crate::error::{Result, ScoutError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File created and removed to probe write access.
const WRITE_PROBE_NAME: &str = ".lora-scout-write-probe";

/// A LoRA file present on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoraFileEntry {
    pub file_name: String,
    pub size_bytes: u64,
}

/// Directory status as reported to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryHealth {
    pub path: PathBuf,
    pub exists: bool,
    pub writable: bool,
    pub lora_count: usize,
    /// Free space on the containing disk, when it can be determined.
    pub free_bytes: Option<u64>,
}

/// Files sharing one base name under different extensions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    pub base_name: String,
    pub files: Vec<String>,
}

/// The LoRA directory.
#[derive(Debug, Clone)]
pub struct LoraDirectory {
    root: PathBuf,
}

impl LoraDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Path a file with this name would have inside the directory.
    pub fn file_path(&self, file_name: &str) -> PathBuf {
        self.root.join(file_name)
    }

    /// Create the directory if needed.
    pub fn ensure_exists(&self) -> Result<()> {
        if self.root.exists() && !self.root.is_dir() {
            return Err(ScoutError::NotADirectory(self.root.clone()));
        }
        std::fs::create_dir_all(&self.root).map_err(|e| ScoutError::io_with_path(e, &self.root))
    }

    /// Find the file for a LoRA name.
    ///
    /// Extensions are stripped from `name`, then every extension is tried
    /// with the name as given, lowercased and uppercased.
    pub fn locate(&self, name: &str) -> Option<PathBuf> {
        if name.is_empty() {
            return None;
        }

        let base = strip_lora_extensions(name);
        let variants = [base.clone(), base.to_lowercase(), base.to_uppercase()];

        for ext in LoraConfig::EXTENSIONS {
            for variant in &variants {
                let candidate = self.root.join(format!("{}{}", variant, ext));
                if candidate.is_file() {
                    return Some(candidate);
                }
            }
        }
        None
    }

    pub fn exists(&self, name: &str) -> bool {
        self.locate(name).is_some()
    }

    /// LoRA files in the directory, sorted by name.
    ///
    /// A missing directory lists as empty.
    pub fn list(&self) -> Result<Vec<LoraFileEntry>> {
        if !self.root.exists() {
            debug!("LoRA directory {} does not exist", self.root.display());
            return Ok(Vec::new());
        }
        if !self.root.is_dir() {
            return Err(ScoutError::NotADirectory(self.root.clone()));
        }

        let read_dir =
            std::fs::read_dir(&self.root).map_err(|e| ScoutError::io_with_path(e, &self.root))?;

        let mut entries = Vec::new();
        for entry in read_dir {
            let entry = entry.map_err(|e| ScoutError::io_with_path(e, &self.root))?;
            let file_name = entry.file_name().to_string_lossy().into_owned();
            if !has_lora_extension(&file_name) {
                continue;
            }
            let metadata = match entry.metadata() {
                Ok(metadata) if metadata.is_file() => metadata,
                _ => continue,
            };
            entries.push(LoraFileEntry {
                file_name,
                size_bytes: metadata.len(),
            });
        }

        entries.sort_by(|a, b| a.file_name.cmp(&b.file_name));
        Ok(entries)
    }

    pub fn count(&self) -> Result<usize> {
        Ok(self.list()?.len())
    }

    /// Base names present under more than one extension, sorted.
    pub fn find_duplicates(&self) -> Result<Vec<DuplicateGroup>> {
        let mut by_base: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for entry in self.list()? {
            if let Some(stem) = naming::lora_stem(&entry.file_name) {
                by_base
                    .entry(stem.to_string())
                    .or_default()
                    .push(entry.file_name.clone());
            }
        }

        Ok(by_base
            .into_iter()
            .filter(|(_, files)| files.len() > 1)
            .map(|(base_name, files)| DuplicateGroup { base_name, files })
            .collect())
    }

    /// Existence, write access, file count and free space.
    pub fn check(&self) -> DirectoryHealth {
        let exists = self.root.is_dir();
        DirectoryHealth {
            path: self.root.clone(),
            exists,
            writable: exists && self.probe_writable(),
            lora_count: self.count().unwrap_or(0),
            free_bytes: exists.then(|| free_space(&self.root)).flatten(),
        }
    }

    fn probe_writable(&self) -> bool {
        let probe = self.root.join(WRITE_PROBE_NAME);
        match std::fs::write(&probe, b"") {
            Ok(()) => {
                let _ = std::fs::remove_file(&probe);
                true
            }
            Err(e) => {
                debug!("LoRA directory not writable: {}", e);
                false
            }
        }
    }
}

/// Available space on the disk holding `path` (longest matching mount point).
fn free_space(path: &Path) -> Option<u64> {
    use sysinfo::Disks;

    let path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    let disks = Disks::new_with_refreshed_list();

    disks
        .list()
        .iter()
        .filter(|disk| path.starts_with(disk.mount_point()))
        .max_by_key(|disk| disk.mount_point().as_os_str().len())
        .map(|disk| disk.available_space())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str, size: usize) {
        std::fs::write(dir.join(name), vec![0u8; size]).unwrap();
    }

    #[test]
    fn test_exists_strips_extension() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "Addams.safetensors", 1);
        let dir = LoraDirectory::new(temp.path());

        assert!(dir.exists("Addams"));
        assert!(dir.exists("Addams.safetensors"));
        assert!(dir.exists("Addams.ckpt"));
        assert!(!dir.exists("Munsters"));
        assert!(!dir.exists(""));
    }

    #[test]
    fn test_exists_case_variants() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "goodhands.pt", 1);
        touch(temp.path(), "STYLE.ckpt", 1);
        let dir = LoraDirectory::new(temp.path());

        assert!(dir.exists("GoodHands"));
        assert!(dir.exists("style"));
        assert_eq!(
            dir.locate("GoodHands.safetensors").unwrap().file_name().unwrap(),
            "goodhands.pt"
        );
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_mixed_case_file_needs_exact_spelling() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "MixedCase.safetensors", 1);
        let dir = LoraDirectory::new(temp.path());

        assert!(dir.exists("MixedCase"));
        assert!(!dir.exists("mixedcase"));
        assert!(!dir.exists("MIXEDCASE.pt"));
    }

    #[test]
    fn test_directories_do_not_count_as_files() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join("fake.safetensors")).unwrap();
        let dir = LoraDirectory::new(temp.path());
        assert!(!dir.exists("fake"));
        assert!(dir.list().unwrap().is_empty());
    }

    #[test]
    fn test_list_filters_and_sorts() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "b.safetensors", 10);
        touch(temp.path(), "a.pt", 3);
        touch(temp.path(), "notes.txt", 1);
        touch(temp.path(), "c.safetensors.part", 1);
        let dir = LoraDirectory::new(temp.path());

        assert_eq!(
            dir.list().unwrap(),
            vec![
                LoraFileEntry {
                    file_name: "a.pt".into(),
                    size_bytes: 3
                },
                LoraFileEntry {
                    file_name: "b.safetensors".into(),
                    size_bytes: 10
                },
            ]
        );
        assert_eq!(dir.count().unwrap(), 2);
    }

    #[test]
    fn test_missing_directory() {
        let temp = TempDir::new().unwrap();
        let dir = LoraDirectory::new(temp.path().join("absent"));
        assert!(dir.list().unwrap().is_empty());

        let health = dir.check();
        assert!(!health.exists);
        assert!(!health.writable);
        assert_eq!(health.free_bytes, None);

        dir.ensure_exists().unwrap();
        assert!(dir.check().exists);
    }

    #[test]
    fn test_file_is_not_a_directory() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "loras", 1);
        let dir = LoraDirectory::new(temp.path().join("loras"));
        assert!(matches!(dir.list(), Err(ScoutError::NotADirectory(_))));
        assert!(matches!(dir.ensure_exists(), Err(ScoutError::NotADirectory(_))));
    }

    #[test]
    fn test_check_existing_directory() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "a.safetensors", 1);
        let health = LoraDirectory::new(temp.path()).check();
        assert!(health.exists);
        assert!(health.writable);
        assert_eq!(health.lora_count, 1);
        assert!(!temp.path().join(WRITE_PROBE_NAME).exists());
    }

    #[test]
    fn test_find_duplicates() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "addams.safetensors", 1);
        touch(temp.path(), "addams.ckpt", 1);
        touch(temp.path(), "style.pt", 1);
        let dir = LoraDirectory::new(temp.path());

        assert_eq!(
            dir.find_duplicates().unwrap(),
            vec![DuplicateGroup {
                base_name: "addams".into(),
                files: vec!["addams.ckpt".into(), "addams.safetensors".into()],
            }]
        );
    }
}
