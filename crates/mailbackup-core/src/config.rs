//! Archive configuration

use mailbackup_auth::Credentials;
use mailbackup_imap::{ImapConnector, DEFAULT_IMAP_PORT};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Name of the progress file inside the output root
pub const DEFAULT_PROGRESS_FILE: &str = ".downloaded";

/// Deadline applied to each network operation
pub const DEFAULT_OP_TIMEOUT: Duration = Duration::from_secs(120);

/// IMAP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// IMAP server port (implicit TLS)
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_IMAP_PORT,
        }
    }
}

impl ServerConfig {
    /// Build a session provider for the given credentials
    pub fn connector(&self, credentials: &Credentials) -> ImapConnector {
        ImapConnector::new(
            &credentials.host,
            self.port,
            &credentials.username,
            &credentials.password,
        )
    }
}

/// Local archive configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// Directory receiving one sub-directory per folder
    pub output_root: PathBuf,
    /// Re-fetch and rewrite messages that were already archived
    pub overwrite: bool,
    /// Deadline for each list/examine/search/fetch/logout
    pub op_timeout: Duration,
    /// Progress file name, relative to `output_root`
    pub progress_file: String,
    /// Only archive these folders (all selectable folders when empty)
    pub folders: Vec<String>,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from("data"),
            overwrite: false,
            op_timeout: DEFAULT_OP_TIMEOUT,
            progress_file: DEFAULT_PROGRESS_FILE.to_string(),
            folders: Vec::new(),
        }
    }
}

impl ArchiveConfig {
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            output_root: output_root.into(),
            ..Default::default()
        }
    }

    pub fn progress_path(&self) -> PathBuf {
        self.output_root.join(&self.progress_file)
    }

    /// Whether a folder passes the `folders` filter
    pub fn includes(&self, folder: &str) -> bool {
        self.folders.is_empty() || self.folders.iter().any(|f| f == folder)
    }
}
