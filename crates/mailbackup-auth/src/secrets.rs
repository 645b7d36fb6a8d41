//! Secure credential storage using libsecret
//!
//! Stores host, username and password in the system keyring via libsecret,
//! one secret per entry, scoped by a caller-supplied namespace.

use crate::{AuthError, AuthResult};
use std::collections::HashMap;
use tracing::debug;

/// Schema for storing mailbackup credentials
const SCHEMA_NAME: &str = "org.mailbackup.Credentials";

/// One stored credential field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialEntry {
    Host,
    User,
    Password,
}

impl CredentialEntry {
    pub const ALL: [CredentialEntry; 3] = [
        CredentialEntry::Host,
        CredentialEntry::User,
        CredentialEntry::Password,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialEntry::Host => "HOST",
            CredentialEntry::User => "USER",
            CredentialEntry::Password => "PWD",
        }
    }
}

/// A place credentials can be looked up in and saved to
pub trait CredentialStore {
    fn lookup(&self, entry: CredentialEntry) -> AuthResult<Option<String>>;

    fn store(&self, entry: CredentialEntry, value: &str) -> AuthResult<()>;
}

/// Manages secure storage of credentials
pub struct SecretStore {
    schema: libsecret::Schema,
    namespace: String,
}

impl SecretStore {
    /// Create a new secret store for the given namespace
    pub fn new(namespace: impl Into<String>) -> Self {
        let mut attributes = HashMap::new();
        attributes.insert("namespace", libsecret::SchemaAttributeType::String);
        attributes.insert("entry", libsecret::SchemaAttributeType::String);

        let schema = libsecret::Schema::new(SCHEMA_NAME, libsecret::SchemaFlags::NONE, attributes);

        Self {
            schema,
            namespace: namespace.into(),
        }
    }

    fn attributes(&self, entry: CredentialEntry) -> HashMap<&str, &str> {
        HashMap::from([
            ("namespace", self.namespace.as_str()),
            ("entry", entry.as_str()),
        ])
    }
}

impl CredentialStore for SecretStore {
    fn lookup(&self, entry: CredentialEntry) -> AuthResult<Option<String>> {
        let secret = libsecret::password_lookup_sync(
            Some(&self.schema),
            self.attributes(entry),
            None::<&gio::Cancellable>,
        )
        .map_err(|e| AuthError::SecretError(e.to_string()))?;

        match secret {
            Some(value) => {
                debug!("Retrieved {} for {}", entry.as_str(), self.namespace);
                Ok(Some(value.to_string()))
            }
            None => {
                debug!("No stored {} for {}", entry.as_str(), self.namespace);
                Ok(None)
            }
        }
    }

    fn store(&self, entry: CredentialEntry, value: &str) -> AuthResult<()> {
        libsecret::password_store_sync(
            Some(&self.schema),
            self.attributes(entry),
            Some(libsecret::COLLECTION_DEFAULT),
            &format!("mailbackup {} ({})", entry.as_str(), self.namespace),
            value,
            None::<&gio::Cancellable>,
        )
        .map_err(|e| AuthError::SecretError(e.to_string()))?;

        debug!("Stored {} for {}", entry.as_str(), self.namespace);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_names_are_stable() {
        let names: Vec<&str> = CredentialEntry::ALL.iter().map(|e| e.as_str()).collect();
        assert_eq!(names, vec!["HOST", "USER", "PWD"]);
    }
}
