//! One scheduler tick over the queue.
//!
//! The engine is batch-shaped: an external scheduler (cron, systemd timer,
//! Task Scheduler) invokes it, the tick runs to completion, the process
//! exits. A tick is:
//!
//! 1. Ensure the local directories exist (fatal on failure: nothing
//!    downstream can work without them).
//! 2. Fetch new payloads from the remote drop, if one is configured.
//! 3. Deduplicate inbound.
//! 4. Retention sweep (throttled by the stamp file).
//! 5. Announce the run if the queue is non-empty.
//! 6. Drain the queue through the worker.
//!
//! The scheduler is also the single-instance guard: two ticks running
//! concurrently against the same directories would race on the same files.

use std::io;
use std::path::PathBuf;

use thiserror::Error;
use tracing::{info, warn};

use crate::config::Config;
use crate::notify::Notifier;
use crate::queue::{self, DrainError, DrainReport, Drainer, QueueSnapshot, SweepReport};
use crate::types::RunStamp;

/// Errors that abort a tick.
#[derive(Debug, Error)]
pub enum RunError {
    /// A required queue directory could not be created.
    #[error("failed to create directory {path}: {source}")]
    CreateDir { path: PathBuf, source: io::Error },

    /// The inbound directory could not be listed.
    #[error("failed to snapshot inbound queue: {0}")]
    Snapshot(#[source] io::Error),

    /// The drain loop failed outside any single item.
    #[error(transparent)]
    Drain(#[from] DrainError),
}

/// Result type for tick operations.
pub type Result<T> = std::result::Result<T, RunError>;

/// What one tick did.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: RunStamp,
    /// Payloads fetched from the remote drop.
    pub fetched: usize,
    /// Duplicates archived before draining.
    pub duplicates: usize,
    pub sweep: SweepReport,
    pub drain: DrainReport,
    /// Notification POSTs that were attempted and failed (start + completion).
    pub notify_failures: usize,
}

/// Runs one tick against the configured queue.
///
/// # Errors
///
/// Returns an error for startup-fatal conditions (directory creation,
/// unlistable inbound). Transient trouble (unreachable remote, failed
/// notifications, sweep hiccups) is logged and absorbed.
pub fn run_once(config: &Config) -> Result<RunReport> {
    let run_id = RunStamp::now();
    info!(run = %run_id, "tick started");

    ensure_directories(config)?;

    let fetched = match &config.paths.remote {
        Some(remote) => queue::fetch_new_payloads(remote, &config.paths.inbound),
        None => 0,
    };

    let duplicates = match queue::deduplicate(&config.paths.inbound, &config.paths.archive) {
        Ok(moved) => moved,
        Err(error) => {
            warn!(%error, "deduplication skipped");
            0
        }
    };

    let sweep = queue::sweep(
        &config.paths.swept_dirs(),
        config.retention.max_age_days,
        &config.paths.sweep_stamp(),
        config.retention.min_interval_days,
    );

    let notifier = Notifier::new(&config.notify);
    let snapshot = QueueSnapshot::capture(&config.paths.inbound).map_err(RunError::Snapshot)?;

    let mut notify_failures = 0;
    if !snapshot.is_empty() {
        info!(queued = snapshot.len(), "announcing run");
        if notifier.notify_start(&run_id, &snapshot).is_failed() {
            notify_failures += 1;
        }
    }

    let drain = Drainer::new(config, &notifier, run_id.clone()).run()?;
    notify_failures += drain.notify_failures;

    info!(
        run = %run_id,
        fetched,
        duplicates,
        swept = sweep.deleted,
        processed = drain.processed,
        succeeded = drain.succeeded,
        failed = drain.failed,
        passes = drain.passes,
        "tick finished"
    );

    Ok(RunReport {
        run_id,
        fetched,
        duplicates,
        sweep,
        drain,
        notify_failures,
    })
}

fn ensure_directories(config: &Config) -> Result<()> {
    for dir in config.paths.local_dirs() {
        std::fs::create_dir_all(dir).map_err(|source| RunError::CreateDir {
            path: dir.to_path_buf(),
            source,
        })?;
    }
    Ok(())
}
