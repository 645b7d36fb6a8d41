//! Credential resolution
//!
//! Each field is taken from the first source that has it: explicit input,
//! then the credential store, then an interactive prompt.

use crate::{AuthError, AuthResult, CredentialEntry, CredentialStore, Prompter};
use tracing::{debug, info, warn};

/// Host, username and password for one mail store
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub host: String,
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Values given explicitly (command line or environment)
#[derive(Debug, Clone, Default)]
pub struct CredentialInput {
    pub host: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Resolves [`Credentials`] from explicit input, a store and a prompt
pub struct CredentialResolver<'a> {
    store: Option<&'a dyn CredentialStore>,
    prompter: &'a dyn Prompter,
}

impl<'a> CredentialResolver<'a> {
    pub fn new(store: Option<&'a dyn CredentialStore>, prompter: &'a dyn Prompter) -> Self {
        Self { store, prompter }
    }

    /// Resolve all three fields
    pub fn resolve(&self, input: CredentialInput) -> AuthResult<Credentials> {
        let host = self.resolve_field(input.host, CredentialEntry::Host)?;
        let username = self.resolve_field(input.username, CredentialEntry::User)?;
        let password = self.resolve_field(input.password, CredentialEntry::Password)?;

        Ok(Credentials {
            host,
            username,
            password,
        })
    }

    /// Save resolved credentials into the store
    pub fn save(&self, credentials: &Credentials) -> AuthResult<()> {
        let Some(store) = self.store else {
            debug!("No credential store configured, not saving credentials");
            return Ok(());
        };

        store.store(CredentialEntry::Host, &credentials.host)?;
        store.store(CredentialEntry::User, &credentials.username)?;
        store.store(CredentialEntry::Password, &credentials.password)?;

        info!(
            "Saved credentials for {} on {}",
            credentials.username, credentials.host
        );
        Ok(())
    }

    fn resolve_field(
        &self,
        explicit: Option<String>,
        entry: CredentialEntry,
    ) -> AuthResult<String> {
        if let Some(value) = non_empty(explicit) {
            return Ok(value);
        }

        if let Some(store) = self.store {
            // An unavailable keyring only means we fall back to prompting
            match store.lookup(entry) {
                Ok(value) => {
                    if let Some(value) = non_empty(value) {
                        return Ok(value);
                    }
                }
                Err(e) => warn!("Credential store lookup failed: {}", e),
            }
        }

        let value = match entry {
            CredentialEntry::Host => self.prompter.prompt("Host")?,
            CredentialEntry::User => self.prompter.prompt("User")?,
            CredentialEntry::Password => self.prompter.prompt_secret("Password")?,
        };

        non_empty(Some(value)).ok_or(AuthError::MissingCredential(field_name(entry)))
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn field_name(entry: CredentialEntry) -> &'static str {
    match entry {
        CredentialEntry::Host => "host",
        CredentialEntry::User => "username",
        CredentialEntry::Password => "password",
    }
}
