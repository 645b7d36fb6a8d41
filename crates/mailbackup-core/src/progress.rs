//! Per-folder resume watermarks
//!
//! The progress file is a small JSON object mapping folder names to the
//! highest sequence number examined, e.g. `{"INBOX": 42}`.

use crate::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Folder name to highest examined sequence number
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProgressRecord {
    watermarks: BTreeMap<String, u32>,
}

impl ProgressRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded watermark, `None` if the folder was never archived
    pub fn watermark(&self, folder: &str) -> Option<u32> {
        self.watermarks.get(folder).copied()
    }

    /// Whether `seq` was already examined in a previous pass
    pub fn covers(&self, folder: &str, seq: u32) -> bool {
        self.watermark(folder).is_some_and(|mark| seq <= mark)
    }

    /// Raise the watermark to `seq`; never lowers it
    pub fn advance(&mut self, folder: &str, seq: u32) {
        let mark = self.watermarks.entry(folder.to_string()).or_insert(0);
        if seq > *mark {
            *mark = seq;
        }
    }

    /// Forget a folder's watermark
    pub fn reset(&mut self, folder: &str) -> Option<u32> {
        self.watermarks.remove(folder)
    }

    pub fn len(&self) -> usize {
        self.watermarks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.watermarks.is_empty()
    }
}

/// Loads and saves a [`ProgressRecord`] at a fixed path
#[derive(Debug, Clone)]
pub struct ProgressStore {
    path: PathBuf,
}

impl ProgressStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the record. A missing or corrupt file yields an empty record.
    pub fn load(&self) -> ProgressRecord {
        match self.try_load() {
            Ok(Some(record)) => {
                debug!(
                    "Loaded progress for {} folders from {}",
                    record.len(),
                    self.path.display()
                );
                record
            }
            Ok(None) => {
                debug!("No progress file at {}", self.path.display());
                ProgressRecord::new()
            }
            Err(e) => {
                warn!("Ignoring progress file: {}", e);
                ProgressRecord::new()
            }
        }
    }

    fn try_load(&self) -> CoreResult<Option<ProgressRecord>> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(CoreError::StateCorruption(format!(
                    "{}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| CoreError::StateCorruption(format!("{}: {}", self.path.display(), e)))
    }

    /// Replace the file with `record` (write to a sibling, then rename)
    pub fn save(&self, record: &ProgressRecord) -> CoreResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| CoreError::filesystem(parent, e))?;
        }

        let json = serde_json::to_string(record)
            .map_err(|e| CoreError::StateCorruption(e.to_string()))?;

        let temp_path = self.temp_path();
        fs::write(&temp_path, json).map_err(|e| CoreError::filesystem(&temp_path, e))?;
        fs::rename(&temp_path, &self.path).map_err(|e| CoreError::filesystem(&self.path, e))?;

        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_empty_record() {
        let dir = TempDir::new().unwrap();
        let store = ProgressStore::new(dir.path().join(".downloaded"));
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_corrupt_file_is_empty_record() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".downloaded");
        fs::write(&path, "{\"INBOX\": ").unwrap();

        let store = ProgressStore::new(&path);
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let store = ProgressStore::new(dir.path().join("nested").join(".downloaded"));

        let mut record = ProgressRecord::new();
        record.advance("INBOX", 2);
        record.advance("Archive/2020", 17);
        store.save(&record).unwrap();

        assert_eq!(store.load(), record);
        assert!(!dir.path().join("nested").join(".downloaded.tmp").exists());
    }

    #[test]
    fn test_file_format_is_plain_mapping() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".downloaded");
        fs::write(&path, r#"{"INBOX": 5, "Sent": 1}"#).unwrap();

        let record = ProgressStore::new(&path).load();
        assert_eq!(record.watermark("INBOX"), Some(5));
        assert_eq!(record.watermark("Sent"), Some(1));
        assert_eq!(record.watermark("Drafts"), None);
    }

    #[test]
    fn test_advance_never_lowers() {
        let mut record = ProgressRecord::new();
        record.advance("INBOX", 5);
        record.advance("INBOX", 3);
        assert_eq!(record.watermark("INBOX"), Some(5));

        assert!(record.covers("INBOX", 5));
        assert!(!record.covers("INBOX", 6));
        assert!(!record.covers("Sent", 1));
    }
}
