//! mailbackup - incremental IMAP archiver
//!
//! Downloads every message of every folder into `<root>/<folder>/<hash>.eml`
//! and remembers how far each folder got in `<root>/.downloaded`.

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::Cli;
use mailbackup_auth::{
    CredentialResolver, CredentialStore, Credentials, SecretStore, TerminalPrompter,
};
use mailbackup_core::{ArchiveEvent, Archiver, FolderOutcome, RunSummary};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Log a progress line every this many messages
const PROGRESS_INTERVAL: usize = 100;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(cli.log_filter(std::env::var(EnvFilter::DEFAULT_ENV).ok().as_deref()))
        .init();

    info!("Starting mailbackup");

    let credentials = resolve_credentials(&cli).context("Failed to resolve credentials")?;
    let connector = cli.server_config().connector(&credentials);
    info!(
        "Archiving {}@{} into {}",
        credentials.username,
        connector.host(),
        cli.output.display()
    );

    let (tx, rx) = mpsc::channel(256);
    let mut archiver = Archiver::new(connector, cli.archive_config()).with_events(tx);
    watch_ctrl_c(archiver.stop_handle());
    let reporter = tokio::spawn(report_progress(rx));

    let summary = archiver
        .run()
        .await
        .context("Failed to list folders on the server")?;

    drop(archiver);
    let _ = reporter.await;

    log_summary(&summary);
    Ok(())
}

fn resolve_credentials(cli: &Cli) -> Result<Credentials> {
    let prompter = TerminalPrompter;
    let store = (!cli.no_keyring).then(|| SecretStore::new(cli.keyring_namespace.as_str()));
    let resolver = CredentialResolver::new(
        store.as_ref().map(|s| s as &dyn CredentialStore),
        &prompter,
    );

    let credentials = resolver.resolve(cli.credential_input())?;

    if cli.save_credentials {
        resolver
            .save(&credentials)
            .context("Failed to save credentials in the keyring")?;
        info!("Credentials saved in keyring namespace {}", cli.keyring_namespace);
    }

    Ok(credentials)
}

/// First Ctrl-C stops after the message in flight, the second one exits
fn watch_ctrl_c(stop: Arc<AtomicBool>) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        warn!("Interrupted, finishing the current message");
        stop.store(true, Ordering::SeqCst);

        if tokio::signal::ctrl_c().await.is_ok() {
            std::process::exit(130);
        }
    });
}

async fn report_progress(mut rx: mpsc::Receiver<ArchiveEvent>) {
    let mut totals: HashMap<String, (usize, usize)> = HashMap::new();

    while let Some(event) = rx.recv().await {
        match event {
            ArchiveEvent::RunStarted { folders } => info!("{} folders to archive", folders),
            ArchiveEvent::FolderStarted { folder, total } => {
                totals.insert(folder, (0, total));
            }
            ArchiveEvent::MessageArchived { folder, .. } => {
                if let Some((done, total)) = totals.get_mut(&folder) {
                    *done += 1;
                    if *done % PROGRESS_INTERVAL == 0 {
                        info!("{}: {}/{}", folder, done, total);
                    }
                }
            }
            ArchiveEvent::FolderCompleted { folder, .. }
            | ArchiveEvent::FolderInterrupted { folder, .. }
            | ArchiveEvent::FolderFailed { folder, .. } => {
                totals.remove(&folder);
            }
            ArchiveEvent::RunCompleted { .. } => {}
        }
    }
}

fn log_summary(summary: &RunSummary) {
    for report in &summary.folders {
        let stats = report.outcome.stats();
        match &report.outcome {
            FolderOutcome::Completed(_) => info!(
                "{}: {} messages, {} new, {} duplicates",
                report.folder, stats.total, stats.written, stats.duplicates
            ),
            FolderOutcome::Interrupted(_) => warn!(
                "{}: interrupted after {} new messages",
                report.folder, stats.written
            ),
            FolderOutcome::Failed { seq, error, .. } => match seq {
                Some(seq) => error!(
                    "{}: failed at message {} ({} new before): {}",
                    report.folder, seq, stats.written, error
                ),
                None => error!("{}: failed: {}", report.folder, error),
            },
        }
    }

    if summary.interrupted {
        warn!("Run interrupted, the next run resumes where this one stopped");
    }
    info!(
        "Done: {} folders archived, {} failed, {} new messages",
        summary.completed(),
        summary.failed(),
        summary.written()
    );
}
