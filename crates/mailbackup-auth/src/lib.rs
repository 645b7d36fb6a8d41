//! Credential handling for mailbackup
//!
//! Resolves host, username and password from, in order:
//! 1. Explicit input (command line or environment)
//! 2. The system keyring via libsecret
//! 3. An interactive prompt

mod credentials;
mod error;
mod prompt;
mod secrets;

pub use credentials::{CredentialInput, CredentialResolver, Credentials};
pub use error::{AuthError, AuthResult};
pub use prompt::{Prompter, TerminalPrompter};
pub use secrets::{CredentialEntry, CredentialStore, SecretStore};

/// Default keyring namespace
pub const DEFAULT_NAMESPACE: &str = "mailbackup";
