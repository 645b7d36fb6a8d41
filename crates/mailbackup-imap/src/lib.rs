//! IMAP access for mailbackup
//!
//! Provides the read-only session operations the archiver needs
//! (list, examine, search, fetch) and folder name normalization.

mod client;
mod error;
mod folder;
mod session;

pub use client::{ImapClient, ImapConnector, DEFAULT_IMAP_PORT};
pub use error::{ImapError, ImapResult};
pub use folder::{list_folders, normalize_folder_name, Folder};
pub use session::{MailSession, SessionProvider};
