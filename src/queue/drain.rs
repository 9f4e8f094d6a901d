//! Draining the inbound queue through the external worker.
//!
//! This is the engine's core state machine. Each item moves
//! `Pending → Running → {Succeeded, Failed}` exactly once:
//!
//! 1. Claim the item with a `.proc` marker.
//! 2. Invoke the worker with the item's absolute path.
//! 3. Classify, in precedence order: non-zero exit, unparseable stdout,
//!    completion flag false, success.
//! 4. Route to the terminal location: success writes the result record into
//!    archive then moves the payload there as `processed_…`; failure moves
//!    the payload to the failed directory as `failed_…`. A failed item is
//!    never moved back into inbound; retries require explicit external
//!    re-submission.
//! 5. Clear the marker, fire the completion notification, drop the stderr
//!    capture, pace.
//!
//! No failure crosses an item boundary: anything that goes wrong with one
//! item (a crashing worker, garbage output, a spawn error) downgrades to
//! the Failed classification and the loop moves on.
//!
//! The outer loop takes a fresh listing per pass, so items that arrive
//! while a pass runs are picked up by the next pass. It terminates when a
//! pass observes inbound empty, or at the configured pass ceiling, the
//! guard against a producer that never stops feeding the directory.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::notify::{CompletionEvent, ItemStatus, Notifier};
use crate::types::{RunStamp, op_code_of};
use crate::worker::{Invocation, ResultRecord, WorkerGateway};

use super::snapshot::QueueSnapshot;

/// Errors that can occur while draining.
#[derive(Debug, Error)]
pub enum DrainError {
    /// The inbound directory could not be listed.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for drain operations.
pub type Result<T> = std::result::Result<T, DrainError>;

/// Counters for one drain invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Items run through the worker.
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Outer passes taken over the inbound listing.
    pub passes: u32,
    /// True when the pass ceiling cut the run short.
    pub truncated: bool,
    /// Completion notifications that were attempted and failed.
    pub notify_failures: usize,
}

/// One item's classification, before routing.
#[derive(Debug)]
struct Classified {
    status: ItemStatus,
    message: String,
    log_path: Option<String>,
    /// Present only on success: the record to archive alongside the payload.
    record: Option<ResultRecord>,
}

/// Drains the inbound directory for one tick.
pub struct Drainer<'a> {
    config: &'a Config,
    notifier: &'a Notifier,
    run_id: RunStamp,
}

impl<'a> Drainer<'a> {
    pub fn new(config: &'a Config, notifier: &'a Notifier, run_id: RunStamp) -> Drainer<'a> {
        Drainer {
            config,
            notifier,
            run_id,
        }
    }

    /// Runs the drain loop until inbound is empty or the pass ceiling hits.
    ///
    /// # Errors
    ///
    /// Returns an error only if the inbound directory cannot be listed;
    /// per-item failures are routed, not raised.
    pub fn run(&self) -> Result<DrainReport> {
        let inbound = &self.config.paths.inbound;

        let cleared = clear_interrupted_markers(inbound)?;
        if cleared > 0 {
            warn!(cleared, "cleared in-progress markers from an interrupted run");
        }

        let gateway = WorkerGateway::new(&self.config.worker.command);
        let mut report = DrainReport::default();

        loop {
            let snapshot = QueueSnapshot::capture(inbound)?;
            if snapshot.is_empty() {
                break;
            }
            if report.passes >= self.config.drain.max_passes {
                warn!(
                    remaining = snapshot.len(),
                    passes = report.passes,
                    "drain pass ceiling reached, leaving remainder for the next tick"
                );
                report.truncated = true;
                break;
            }

            report.passes += 1;
            debug!(pass = report.passes, queued = snapshot.len(), "starting drain pass");

            for file_name in snapshot.file_names() {
                let path = inbound.join(file_name);
                if !path.exists() {
                    continue;
                }
                self.process_item(&gateway, file_name, &path, &mut report);
                std::thread::sleep(self.config.drain.pause());
            }
        }

        Ok(report)
    }

    /// Processes a single item start to finish. Never raises.
    fn process_item(
        &self,
        gateway: &WorkerGateway<'_>,
        file_name: &str,
        path: &Path,
        report: &mut DrainReport,
    ) {
        let op = op_code_of(file_name);
        info!(item = file_name, op = %op, "processing payload");
        report.processed += 1;

        let marker = marker_path(path);
        if let Err(error) = std::fs::write(&marker, b"") {
            warn!(%error, item = file_name, "could not create in-progress marker");
        }

        // The invocation stays alive until after the notification so the
        // stderr capture file can be read and attached.
        let (classified, invocation): (Classified, Option<Invocation>) =
            match gateway.invoke(path) {
                Ok(invocation) => (classify(&invocation), Some(invocation)),
                Err(error) => (
                    Classified {
                        status: ItemStatus::Failure,
                        message: format!("failed to launch worker: {error}"),
                        log_path: None,
                        record: None,
                    },
                    None,
                ),
            };

        match classified.status {
            ItemStatus::Success => {
                info!(item = file_name, "worker succeeded");
                // classify() always attaches the record on success.
                if let Some(record) = &classified.record {
                    self.archive_success(file_name, path, record);
                }
                report.succeeded += 1;
            }
            ItemStatus::Failure => {
                warn!(item = file_name, message = %classified.message, "worker failed");
                self.route_failure(file_name, path);
                report.failed += 1;
            }
        }

        if marker.exists()
            && let Err(error) = std::fs::remove_file(&marker)
        {
            warn!(%error, item = file_name, "could not remove in-progress marker");
        }

        let remaining = match QueueSnapshot::capture(&self.config.paths.inbound) {
            Ok(snapshot) => snapshot,
            Err(error) => {
                warn!(%error, "could not recompute queue snapshot for notification");
                QueueSnapshot::default()
            }
        };
        let event = CompletionEvent::new(
            &self.run_id,
            op.as_str(),
            classified.status,
            classified.message,
            classified.log_path.as_deref(),
            &remaining,
        );
        if self.notifier.notify_completion(&event).is_failed() {
            report.notify_failures += 1;
        }

        // Deletes the stderr capture file.
        drop(invocation);
    }

    /// Writes the result record into archive, then moves the payload there.
    ///
    /// The two steps cannot be made jointly atomic on a plain filesystem;
    /// the result is written first, and a move failure leaves the payload in
    /// inbound for the next tick without reversing the record.
    fn archive_success(&self, file_name: &str, path: &Path, record: &ResultRecord) {
        let archive = &self.config.paths.archive;

        let result_path = archive.join(format!("result_{}_{}", self.run_id, file_name));
        if let Err(error) = write_atomic(&result_path, record) {
            warn!(%error, item = file_name, "failed to write result record");
        }

        let processed_path = archive.join(format!("processed_{}_{}", self.run_id, file_name));
        if let Err(error) = super::move_file(path, &processed_path) {
            warn!(%error, item = file_name, "failed to move processed payload to archive");
        }
    }

    /// Moves a failed payload into the failed directory.
    fn route_failure(&self, file_name: &str, path: &Path) {
        let failed_path = self
            .config
            .paths
            .failed
            .join(format!("failed_{}_{}", self.run_id, file_name));
        if let Err(error) = super::move_file(path, &failed_path) {
            warn!(%error, item = file_name, "failed to move payload to failed directory");
        }
    }
}

/// Classifies a completed worker invocation, in precedence order.
fn classify(invocation: &Invocation) -> Classified {
    if !invocation.status.success() {
        let message = match invocation.status.code() {
            Some(code) => format!("exit code {code}"),
            None => "terminated by signal".to_string(),
        };
        return Classified {
            status: ItemStatus::Failure,
            message,
            log_path: invocation.stderr_path().to_str().map(str::to_string),
            record: None,
        };
    }

    match ResultRecord::parse(&invocation.stdout) {
        Err(error) => {
            debug!(%error, "worker stdout did not parse as a result record");
            Classified {
                status: ItemStatus::Failure,
                message: "invalid output".to_string(),
                log_path: invocation.stderr_path().to_str().map(str::to_string),
                record: None,
            }
        }
        Ok(record) if !record.completed => Classified {
            status: ItemStatus::Failure,
            message: record.exception_message.clone().unwrap_or_default(),
            log_path: record.log_path.clone(),
            record: None,
        },
        Ok(record) => Classified {
            status: ItemStatus::Success,
            message: String::new(),
            log_path: record.log_path.clone(),
            record: Some(record),
        },
    }
}

/// Removes orphaned `.proc` markers left by a killed run.
///
/// Called once at the start of a tick, before any item is claimed. The
/// payloads themselves are still in inbound and are simply reprocessed.
fn clear_interrupted_markers(inbound: &Path) -> io::Result<usize> {
    if !inbound.exists() {
        return Ok(0);
    }

    let mut cleared = 0;
    for entry in std::fs::read_dir(inbound)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().is_some_and(|e| e == "proc") {
            warn!(
                marker = %path.display(),
                "in-progress marker from interrupted run, item will be reprocessed"
            );
            if std::fs::remove_file(&path).is_ok() {
                cleared += 1;
            }
        }
    }
    Ok(cleared)
}

/// The `.proc` marker path for a payload.
fn marker_path(payload: &Path) -> PathBuf {
    let mut name = payload.as_os_str().to_os_string();
    name.push(".proc");
    PathBuf::from(name)
}

/// Serializes a record to a file via write-temp-then-rename.
fn write_atomic(path: &Path, record: &ResultRecord) -> io::Result<()> {
    let bytes = serde_json::to_vec_pretty(record)?;
    let tmp = tmp_sibling(path);
    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, path)
}

fn tmp_sibling(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}
