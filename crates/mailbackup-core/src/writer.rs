//! Content-addressed message files

use crate::{CoreError, CoreResult};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Extension of archived message files
pub const MESSAGE_EXTENSION: &str = "eml";

/// Result of a single write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    /// False when an identical file already existed
    pub written: bool,
    pub path: PathBuf,
}

/// Lowercase hex SHA-256 of the raw message
pub fn content_hash(raw: &[u8]) -> String {
    format!("{:x}", Sha256::digest(raw))
}

/// Writes messages to `<root>/<folder>/<hash>.eml`
#[derive(Debug, Clone)]
pub struct ContentWriter {
    root: PathBuf,
    /// Top-level names under `root` that belong to other files
    reserved: Vec<String>,
}

impl ContentWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            reserved: Vec::new(),
        }
    }

    /// Refuse folders whose first component is `name` or its `.tmp` sibling
    pub fn reserve(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.reserved.push(format!("{}.tmp", name));
        self.reserved.push(name);
        self
    }

    /// Path a message with these bytes would be stored at
    pub fn message_path(&self, folder: &str, raw: &[u8]) -> CoreResult<PathBuf> {
        let file_name = format!("{}.{}", content_hash(raw), MESSAGE_EXTENSION);
        Ok(self.folder_dir(folder)?.join(file_name))
    }

    /// Write `raw` unless an identical file exists and `overwrite` is off
    pub fn write(&self, folder: &str, raw: &[u8], overwrite: bool) -> CoreResult<WriteOutcome> {
        let path = self.message_path(folder, raw)?;

        if !overwrite && path.is_file() {
            debug!("Skipping existing file {}", path.display());
            return Ok(WriteOutcome {
                written: false,
                path,
            });
        }

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| CoreError::filesystem(dir, e))?;
        }

        let temp_path = path.with_extension(format!("{}.tmp", MESSAGE_EXTENSION));
        fs::write(&temp_path, raw).map_err(|e| CoreError::filesystem(&temp_path, e))?;
        fs::rename(&temp_path, &path).map_err(|e| CoreError::filesystem(&path, e))?;

        debug!("Wrote file {}", path.display());
        Ok(WriteOutcome {
            written: true,
            path,
        })
    }

    fn folder_dir(&self, folder: &str) -> CoreResult<PathBuf> {
        let relative = Path::new(folder);
        let safe = !folder.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        let reserved = relative.components().next().is_some_and(|first| {
            self.reserved
                .iter()
                .any(|name| first.as_os_str() == name.as_str())
        });
        if !safe || reserved {
            return Err(CoreError::UnsafeFolderName(folder.to_string()));
        }
        Ok(self.root.join(relative))
    }
}
