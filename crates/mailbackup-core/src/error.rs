//! Error types for the core module

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type for core operations
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in core operations
#[derive(Debug, Error)]
pub enum CoreError {
    /// Opening or keeping the session failed
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Unexpected response to EXAMINE, SEARCH or FETCH
    #[error("IMAP error: {0}")]
    ImapError(String),

    /// A network operation exceeded its deadline
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// Directory creation, write or rename failed
    #[error("Filesystem error at {}: {source}", path.display())]
    FilesystemError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Folder name would resolve outside the output root
    #[error("Folder name is not a safe relative path: {0}")]
    UnsafeFolderName(String),

    /// Progress file could not be read or parsed
    #[error("Progress file is corrupt: {0}")]
    StateCorruption(String),
}

/// Coarse classification of a [`CoreError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Connection,
    RemoteProtocol,
    Filesystem,
    StateCorruption,
}

impl CoreError {
    pub fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CoreError::FilesystemError {
            path: path.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::ConnectionError(_) | CoreError::Timeout(_) => ErrorKind::Connection,
            CoreError::ImapError(_) => ErrorKind::RemoteProtocol,
            CoreError::FilesystemError { .. } | CoreError::UnsafeFolderName(_) => {
                ErrorKind::Filesystem
            }
            CoreError::StateCorruption(_) => ErrorKind::StateCorruption,
        }
    }
}

impl From<mailbackup_imap::ImapError> for CoreError {
    fn from(e: mailbackup_imap::ImapError) -> Self {
        if e.is_connection() {
            CoreError::ConnectionError(e.to_string())
        } else {
            CoreError::ImapError(e.to_string())
        }
    }
}
