//! IMAP client implementation

use crate::{ImapError, ImapResult, MailSession, SessionProvider};
use async_imap::types::{Fetch, Name};
use async_imap::Session;
use async_native_tls::TlsStream;
use async_std::net::TcpStream;
use async_trait::async_trait;
use futures::TryStreamExt;
use imap_proto::types::NameAttribute;
use tracing::{debug, info};

// Type alias for our TLS stream
type ImapStream = TlsStream<TcpStream>;

/// Implicit-TLS IMAP port
pub const DEFAULT_IMAP_PORT: u16 = 993;

/// IMAP client for read-only archival
pub struct ImapClient {
    session: Option<Session<ImapStream>>,
    host: String,
    port: u16,
}

impl ImapClient {
    /// Create a new IMAP client
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            session: None,
            host: host.into(),
            port,
        }
    }

    /// Connect and authenticate using LOGIN (username/password)
    pub async fn authenticate_login(&mut self, username: &str, password: &str) -> ImapResult<()> {
        info!("Connecting to {}:{}", self.host, self.port);

        // Create TCP connection
        let tcp_stream = TcpStream::connect(format!("{}:{}", self.host, self.port))
            .await
            .map_err(|e| ImapError::ConnectionFailed(e.to_string()))?;

        // Wrap with TLS
        let tls_connector = async_native_tls::TlsConnector::new();
        let tls_stream = tls_connector
            .connect(&self.host, tcp_stream)
            .await
            .map_err(|e| ImapError::TlsError(e.to_string()))?;

        debug!("TLS connection established");

        let client = async_imap::Client::new(tls_stream);

        info!("Authenticating with LOGIN for {}", username);

        let session = client
            .login(username, password)
            .await
            .map_err(|(e, _)| ImapError::AuthenticationFailed(e.to_string()))?;

        self.session = Some(session);
        info!("LOGIN authentication successful");
        Ok(())
    }

    /// Get the session, returning an error if not connected
    fn session_mut(&mut self) -> ImapResult<&mut Session<ImapStream>> {
        self.session.as_mut().ok_or(ImapError::NotConnected)
    }
}

#[async_trait]
impl MailSession for ImapClient {
    async fn list_raw(&mut self) -> ImapResult<Vec<String>> {
        let session = self.session_mut()?;

        let names: Vec<Name> = session
            .list(None, Some("*"))
            .await
            .map_err(|e| ImapError::ServerError(e.to_string()))?
            .try_collect()
            .await
            .map_err(|e| ImapError::ServerError(e.to_string()))?;

        debug!("Found {} mailboxes", names.len());
        Ok(names.iter().map(list_line).collect())
    }

    async fn examine(&mut self, folder: &str) -> ImapResult<u32> {
        let session = self.session_mut()?;

        let mailbox = session
            .examine(folder)
            .await
            .map_err(|e| ImapError::FolderNotFound(format!("{}: {}", folder, e)))?;

        debug!("Examined folder {} with {} messages", folder, mailbox.exists);
        Ok(mailbox.exists)
    }

    async fn search_all(&mut self) -> ImapResult<Vec<u32>> {
        let session = self.session_mut()?;

        let found = session
            .search("ALL")
            .await
            .map_err(|e| ImapError::ServerError(e.to_string()))?;

        let mut seqs: Vec<u32> = found.into_iter().collect();
        seqs.sort_unstable();
        Ok(seqs)
    }

    async fn fetch_raw(&mut self, seq: u32) -> ImapResult<Vec<u8>> {
        let session = self.session_mut()?;

        // Drain the whole response before the next command is issued
        let fetches: Vec<Fetch> = session
            .fetch(seq.to_string(), "RFC822")
            .await
            .map_err(|e| ImapError::ServerError(e.to_string()))?
            .try_collect()
            .await
            .map_err(|e| ImapError::ServerError(e.to_string()))?;

        fetches
            .iter()
            .find_map(|fetch| fetch.body().map(|body| body.to_vec()))
            .ok_or(ImapError::MessageNotFound(seq))
    }

    async fn logout(&mut self) -> ImapResult<()> {
        if let Some(mut session) = self.session.take() {
            session
                .logout()
                .await
                .map_err(|e| ImapError::ServerError(e.to_string()))?;
            debug!("Logged out from {}", self.host);
        }
        Ok(())
    }
}

/// Render a LIST response back into its wire form
fn list_line(name: &Name) -> String {
    let attributes: Vec<String> = name.attributes().iter().map(attribute_str).collect();
    let delimiter = match name.delimiter() {
        Some("\\") => "\"\\\\\"".to_string(),
        Some(delim) => format!("\"{}\"", delim),
        None => "NIL".to_string(),
    };
    format!("({}) {} \"{}\"", attributes.join(" "), delimiter, name.name())
}

fn attribute_str(attribute: &NameAttribute<'_>) -> String {
    match attribute {
        NameAttribute::NoInferiors => "\\Noinferiors".to_string(),
        NameAttribute::NoSelect => "\\Noselect".to_string(),
        NameAttribute::Marked => "\\Marked".to_string(),
        NameAttribute::Unmarked => "\\Unmarked".to_string(),
        NameAttribute::Extension(ext) => ext.to_string(),
        other => format!("\\{:?}", other),
    }
}

/// Opens password-authenticated IMAP sessions
#[derive(Clone)]
pub struct ImapConnector {
    host: String,
    port: u16,
    username: String,
    password: String,
}

impl ImapConnector {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }
}

impl std::fmt::Debug for ImapConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImapConnector")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl SessionProvider for ImapConnector {
    type Session = ImapClient;

    async fn open(&self) -> ImapResult<ImapClient> {
        let mut client = ImapClient::new(&self.host, self.port);
        client
            .authenticate_login(&self.username, &self.password)
            .await?;
        Ok(client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_logout_without_session_is_ok() {
        let mut client = ImapClient::new("imap.example.com", DEFAULT_IMAP_PORT);
        client.logout().await.unwrap();
        client.logout().await.unwrap();
    }

    #[tokio::test]
    async fn test_operations_require_connection() {
        let mut client = ImapClient::new("imap.example.com", DEFAULT_IMAP_PORT);
        assert!(matches!(
            client.search_all().await,
            Err(ImapError::NotConnected)
        ));
        assert!(matches!(
            client.fetch_raw(1).await,
            Err(ImapError::NotConnected)
        ));
    }

    #[test]
    fn test_connector_debug_hides_password() {
        let connector = ImapConnector::new("imap.example.com", 993, "user", "hunter2");
        let shown = format!("{:?}", connector);
        assert!(shown.contains("imap.example.com"));
        assert!(!shown.contains("hunter2"));
    }
}
