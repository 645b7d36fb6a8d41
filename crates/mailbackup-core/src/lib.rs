//! Core archival logic for mailbackup
//!
//! Provides the per-folder executor, the progress record and the
//! content-addressed message writer.

mod archive;
mod config;
mod error;
mod progress;
mod writer;

pub use archive::{ArchiveEvent, Archiver, FolderOutcome, FolderReport, FolderStats, RunSummary};
pub use config::{ArchiveConfig, ServerConfig, DEFAULT_OP_TIMEOUT, DEFAULT_PROGRESS_FILE};
pub use error::{CoreError, CoreResult, ErrorKind};
pub use progress::{ProgressRecord, ProgressStore};
pub use writer::{content_hash, ContentWriter, WriteOutcome, MESSAGE_EXTENSION};
