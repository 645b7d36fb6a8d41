//! Error types for IMAP operations

use thiserror::Error;

/// Result type for IMAP operations
pub type ImapResult<T> = Result<T, ImapError>;

/// Errors that can occur during IMAP operations
#[derive(Debug, Error)]
pub enum ImapError {
    /// Connection failed
    #[error("Failed to connect to IMAP server: {0}")]
    ConnectionFailed(String),

    /// Authentication failed
    #[error("IMAP authentication failed: {0}")]
    AuthenticationFailed(String),

    /// TLS error
    #[error("TLS error: {0}")]
    TlsError(String),

    /// Server returned an error
    #[error("IMAP server error: {0}")]
    ServerError(String),

    /// Folder could not be selected
    #[error("Folder not found: {0}")]
    FolderNotFound(String),

    /// FETCH returned no message body
    #[error("Message not found: sequence {0}")]
    MessageNotFound(u32),

    /// Session is not connected
    #[error("IMAP session is not connected")]
    NotConnected,
}

impl ImapError {
    /// Whether the error happened while establishing the session
    pub fn is_connection(&self) -> bool {
        matches!(
            self,
            ImapError::ConnectionFailed(_)
                | ImapError::AuthenticationFailed(_)
                | ImapError::TlsError(_)
                | ImapError::NotConnected
        )
    }
}
