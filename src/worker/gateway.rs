//! Synchronous invocation of the external worker process.
//!
//! The worker is a black box: it receives the payload's absolute path as
//! its final argument, blocks until done, and communicates back through an
//! exit code, a result record on stdout, and free-form text on stderr.
//! Stderr is routed into a temp capture file so that a crashing worker's
//! output can be attached to the failure notification; the capture file is
//! removed when the [`Invocation`] is dropped.

use std::io;
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};

use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::debug;

/// Errors that can occur while invoking the worker.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// The worker process could not be launched or waited on.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for worker operations.
pub type Result<T> = std::result::Result<T, WorkerError>;

/// One completed worker run.
///
/// Holds the stderr capture file open; dropping the invocation deletes it.
#[derive(Debug)]
pub struct Invocation {
    /// How the process exited.
    pub status: ExitStatus,
    /// Everything the worker wrote to stdout.
    pub stdout: String,
    stderr_capture: NamedTempFile,
}

impl Invocation {
    /// Path of the stderr capture file (valid until the invocation drops).
    pub fn stderr_path(&self) -> &Path {
        self.stderr_capture.path()
    }
}

/// Invokes the configured worker command, one payload at a time.
#[derive(Debug, Clone)]
pub struct WorkerGateway<'a> {
    command: &'a [String],
}

impl<'a> WorkerGateway<'a> {
    /// Wraps a non-empty argv vector (validated at config load).
    pub fn new(command: &'a [String]) -> WorkerGateway<'a> {
        WorkerGateway { command }
    }

    /// Runs the worker against one payload, blocking until it exits.
    ///
    /// # Errors
    ///
    /// Returns an error if the stderr capture file cannot be created or the
    /// process cannot be spawned, never for a worker that runs and fails.
    pub fn invoke(&self, payload: &Path) -> Result<Invocation> {
        let stderr_capture = NamedTempFile::new()?;
        let stderr_handle = stderr_capture.reopen()?;

        debug!(
            program = %self.command[0],
            payload = %payload.display(),
            "invoking worker"
        );

        let output = Command::new(&self.command[0])
            .args(&self.command[1..])
            .arg(payload)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::from(stderr_handle))
            .output()?;

        debug!(status = %output.status, "worker exited");

        Ok(Invocation {
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr_capture,
        })
    }
}
