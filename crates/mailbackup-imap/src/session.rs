//! Session traits consumed by the archiver

use crate::ImapResult;
use async_trait::async_trait;

/// An open, authenticated, read-only view of a mail store.
///
/// Sequence numbers returned by [`MailSession::search_all`] are only valid
/// for the folder selected by the last [`MailSession::examine`] call.
#[async_trait]
pub trait MailSession: Send {
    /// Raw LIST lines, e.g. `(\HasNoChildren) "/" "INBOX"`
    async fn list_raw(&mut self) -> ImapResult<Vec<String>>;

    /// Select a folder read-only, returning its message count
    async fn examine(&mut self, folder: &str) -> ImapResult<u32>;

    /// Sequence numbers of every message in the selected folder, ascending
    async fn search_all(&mut self) -> ImapResult<Vec<u32>>;

    /// Full raw message for one sequence number
    async fn fetch_raw(&mut self, seq: u32) -> ImapResult<Vec<u8>>;

    /// Log out. Must succeed on an already closed session.
    async fn logout(&mut self) -> ImapResult<()>;
}

/// Opens authenticated sessions
#[async_trait]
pub trait SessionProvider: Send + Sync {
    type Session: MailSession;

    async fn open(&self) -> ImapResult<Self::Session>;
}
