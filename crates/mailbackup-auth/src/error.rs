//! Error types for the auth module

use thiserror::Error;

/// Result type for auth operations
pub type AuthResult<T> = Result<T, AuthError>;

/// Errors that can occur while resolving credentials
#[derive(Debug, Error)]
pub enum AuthError {
    /// Secret storage error
    #[error("Secret storage error: {0}")]
    SecretError(String),

    /// Interactive prompt could not be read
    #[error("Prompt failed: {0}")]
    PromptFailed(String),

    /// No source produced a value for this field
    #[error("Missing credential: {0}")]
    MissingCredential(&'static str),

    /// Generic IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
