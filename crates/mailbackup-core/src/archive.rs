//! Archival executor
//!
//! Walks folders one at a time. Each folder gets its own session, which is
//! logged out and followed by a progress checkpoint on every exit path.

use crate::{ArchiveConfig, ContentWriter, CoreError, CoreResult, ProgressRecord, ProgressStore};
use mailbackup_imap::{list_folders, Folder, ImapResult, MailSession, SessionProvider};
use std::future::Future;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Counters for one folder pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderStats {
    /// Messages reported by SEARCH ALL
    pub total: usize,
    /// Covered by the watermark, not fetched
    pub skipped: usize,
    /// Fetched and written
    pub written: usize,
    /// Fetched, identical file already present
    pub duplicates: usize,
}

impl FolderStats {
    /// Messages fetched in this pass
    pub fn fetched(&self) -> usize {
        self.written + self.duplicates
    }
}

/// How a folder pass ended
#[derive(Debug)]
pub enum FolderOutcome {
    /// Every message was examined
    Completed(FolderStats),
    /// A stop was requested before the folder was finished
    Interrupted(FolderStats),
    /// The pass was abandoned; `seq` is the message in flight, if any
    Failed {
        stats: FolderStats,
        seq: Option<u32>,
        error: CoreError,
    },
}

impl FolderOutcome {
    pub fn stats(&self) -> &FolderStats {
        match self {
            FolderOutcome::Completed(stats) | FolderOutcome::Interrupted(stats) => stats,
            FolderOutcome::Failed { stats, .. } => stats,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, FolderOutcome::Failed { .. })
    }
}

#[derive(Debug)]
pub struct FolderReport {
    pub folder: String,
    pub outcome: FolderOutcome,
}

/// Result of a whole run
#[derive(Debug, Default)]
pub struct RunSummary {
    pub folders: Vec<FolderReport>,
    /// The run stopped early on request
    pub interrupted: bool,
}

impl RunSummary {
    pub fn completed(&self) -> usize {
        self.folders
            .iter()
            .filter(|r| matches!(r.outcome, FolderOutcome::Completed(_)))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.folders.iter().filter(|r| r.outcome.is_failed()).count()
    }

    pub fn written(&self) -> usize {
        self.folders.iter().map(|r| r.outcome.stats().written).sum()
    }

    pub fn report(&self, folder: &str) -> Option<&FolderReport> {
        self.folders.iter().find(|r| r.folder == folder)
    }
}

/// Progress notifications sent while archiving
#[derive(Debug, Clone)]
pub enum ArchiveEvent {
    RunStarted {
        folders: usize,
    },
    FolderStarted {
        folder: String,
        total: usize,
    },
    MessageArchived {
        folder: String,
        seq: u32,
        path: PathBuf,
        written: bool,
    },
    FolderCompleted {
        folder: String,
        stats: FolderStats,
    },
    FolderInterrupted {
        folder: String,
        stats: FolderStats,
    },
    FolderFailed {
        folder: String,
        error: String,
    },
    RunCompleted {
        completed: usize,
        failed: usize,
    },
}

enum Pass {
    Finished,
    Stopped,
}

/// Archives every folder of a mail store into content-addressed files
pub struct Archiver<P: SessionProvider> {
    provider: P,
    config: ArchiveConfig,
    writer: ContentWriter,
    store: ProgressStore,
    progress: ProgressRecord,
    events: Option<mpsc::Sender<ArchiveEvent>>,
    stop: Arc<AtomicBool>,
}

impl<P: SessionProvider> Archiver<P> {
    /// Create an archiver, loading any previous progress
    pub fn new(provider: P, config: ArchiveConfig) -> Self {
        let store = ProgressStore::new(config.progress_path());
        let progress = store.load();
        let writer = ContentWriter::new(&config.output_root).reserve(&config.progress_file);

        Self {
            provider,
            config,
            writer,
            store,
            progress,
            events: None,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Send [`ArchiveEvent`]s to `tx`
    pub fn with_events(mut self, tx: mpsc::Sender<ArchiveEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    /// Setting the flag stops the run before the next message
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    pub fn progress(&self) -> &ProgressRecord {
        &self.progress
    }

    /// List the folders to archive and archive them
    pub async fn run(&mut self) -> CoreResult<RunSummary> {
        let folders = self.list_folders().await?;
        Ok(self.archive_folders(&folders).await)
    }

    /// Selectable folders passing the configured filter, sorted by name
    pub async fn list_folders(&self) -> CoreResult<Vec<Folder>> {
        let deadline = self.config.op_timeout;
        let mut session = with_deadline(deadline, self.provider.open()).await?;
        let listed = with_deadline(deadline, list_folders(&mut session)).await;
        self.release(&mut session).await;

        let folders = listed?
            .into_iter()
            .filter(|folder| {
                if !folder.is_selectable() {
                    debug!("Skipping non-selectable folder {}", folder.name);
                    return false;
                }
                self.config.includes(&folder.name)
            })
            .collect::<Vec<_>>();

        info!("Found {} folders to archive", folders.len());
        Ok(folders)
    }

    /// Archive each folder in order; a failing folder never stops the run
    pub async fn archive_folders(&mut self, folders: &[Folder]) -> RunSummary {
        self.emit(ArchiveEvent::RunStarted {
            folders: folders.len(),
        })
        .await;

        let mut summary = RunSummary::default();
        for folder in folders {
            if self.stop_requested() {
                info!("Stop requested, not starting {}", folder.name);
                summary.interrupted = true;
                break;
            }

            let outcome = self.archive_folder(&folder.name).await;
            if matches!(outcome, FolderOutcome::Interrupted(_)) {
                summary.interrupted = true;
            }
            summary.folders.push(FolderReport {
                folder: folder.name.clone(),
                outcome,
            });
        }

        self.checkpoint();

        info!(
            "Run finished: {} folders completed, {} failed, {} messages written",
            summary.completed(),
            summary.failed(),
            summary.written()
        );
        self.emit(ArchiveEvent::RunCompleted {
            completed: summary.completed(),
            failed: summary.failed(),
        })
        .await;

        summary
    }

    /// Archive one folder with its own session
    pub async fn archive_folder(&mut self, folder: &str) -> FolderOutcome {
        let mut stats = FolderStats::default();
        let mut in_flight = None;

        let mut session = match with_deadline(self.config.op_timeout, self.provider.open()).await {
            Ok(session) => session,
            Err(e) => return self.fail(folder, stats, None, e).await,
        };
        debug!("Session opened for {}", folder);

        let result = self
            .archive_with_session(&mut session, folder, &mut stats, &mut in_flight)
            .await;

        self.release(&mut session).await;

        match result {
            Ok(Pass::Finished) => {
                self.checkpoint();
                info!(
                    "Archived {}: {} written, {} duplicates, {} already done",
                    folder, stats.written, stats.duplicates, stats.skipped
                );
                self.emit(ArchiveEvent::FolderCompleted {
                    folder: folder.to_string(),
                    stats: stats.clone(),
                })
                .await;
                FolderOutcome::Completed(stats)
            }
            Ok(Pass::Stopped) => {
                self.checkpoint();
                info!("Stopped {} after {} messages", folder, stats.fetched());
                self.emit(ArchiveEvent::FolderInterrupted {
                    folder: folder.to_string(),
                    stats: stats.clone(),
                })
                .await;
                FolderOutcome::Interrupted(stats)
            }
            Err(e) => self.fail(folder, stats, in_flight, e).await,
        }
    }

    async fn archive_with_session(
        &mut self,
        session: &mut P::Session,
        folder: &str,
        stats: &mut FolderStats,
        in_flight: &mut Option<u32>,
    ) -> CoreResult<Pass> {
        let deadline = self.config.op_timeout;
        let overwrite = self.config.overwrite;

        // Read-only select, flags are never touched
        with_deadline(deadline, session.examine(folder)).await?;
        let seqs = with_deadline(deadline, session.search_all()).await?;

        stats.total = seqs.len();
        info!("Archiving {}... {} messages", folder, seqs.len());
        self.invalidate_stale_watermark(folder, &seqs);

        self.emit(ArchiveEvent::FolderStarted {
            folder: folder.to_string(),
            total: seqs.len(),
        })
        .await;

        for seq in seqs {
            if self.stop_requested() {
                return Ok(Pass::Stopped);
            }

            if !overwrite && self.progress.covers(folder, seq) {
                stats.skipped += 1;
                continue;
            }

            *in_flight = Some(seq);
            let raw = with_deadline(deadline, session.fetch_raw(seq)).await?;
            let outcome = self.writer.write(folder, &raw, overwrite)?;

            if outcome.written {
                stats.written += 1;
            } else {
                stats.duplicates += 1;
                debug!("Message {} in {} is a duplicate", seq, folder);
            }

            // Duplicates advance the watermark too, they were examined
            self.progress.advance(folder, seq);
            self.store.save(&self.progress)?;
            *in_flight = None;

            self.emit(ArchiveEvent::MessageArchived {
                folder: folder.to_string(),
                seq,
                path: outcome.path,
                written: outcome.written,
            })
            .await;
        }

        Ok(Pass::Finished)
    }

    /// Sequence numbers restart when a folder is purged and recreated, so a
    /// watermark above the highest remote number no longer means anything.
    fn invalidate_stale_watermark(&mut self, folder: &str, seqs: &[u32]) {
        let Some(mark) = self.progress.watermark(folder) else {
            return;
        };
        let highest = seqs.last().copied().unwrap_or(0);
        if highest < mark {
            warn!(
                "Watermark {} for {} is above the highest remote sequence {}, re-examining folder",
                mark, folder, highest
            );
            self.progress.reset(folder);
        }
    }

    async fn fail(
        &mut self,
        folder: &str,
        stats: FolderStats,
        seq: Option<u32>,
        error: CoreError,
    ) -> FolderOutcome {
        match seq {
            Some(seq) => error!(
                "Archiving {} failed at sequence {}: {}",
                folder, seq, error
            ),
            None => error!("Archiving {} failed: {}", folder, error),
        }

        self.checkpoint();
        self.emit(ArchiveEvent::FolderFailed {
            folder: folder.to_string(),
            error: error.to_string(),
        })
        .await;

        FolderOutcome::Failed { stats, seq, error }
    }

    async fn release(&self, session: &mut P::Session) {
        match with_deadline(self.config.op_timeout, session.logout()).await {
            Ok(()) => debug!("Session released"),
            Err(e) => warn!("Logout failed: {}", e),
        }
    }

    fn checkpoint(&self) {
        if let Err(e) = self.store.save(&self.progress) {
            error!(
                "Failed to save progress to {}: {}",
                self.store.path().display(),
                e
            );
        }
    }

    fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    async fn emit(&self, event: ArchiveEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event).await;
        }
    }
}

async fn with_deadline<T>(
    deadline: Duration,
    operation: impl Future<Output = ImapResult<T>>,
) -> CoreResult<T> {
    match tokio::time::timeout(deadline, operation).await {
        Ok(result) => result.map_err(CoreError::from),
        Err(_) => Err(CoreError::Timeout(deadline)),
    }
}
