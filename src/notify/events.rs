//! Notification event payloads.
//!
//! Two JSON shapes are POSTed to the configured endpoints: a run-start
//! event with a snapshot of the queue, and a per-item completion event with
//! the outcome and a freshly recomputed remaining-queue snapshot. Field
//! names are camelCase on the wire.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::queue::QueueSnapshot;
use crate::types::RunStamp;

/// The outcome reported for one processed item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ItemStatus {
    Success,
    Failure,
}

/// Fired once before the drain loop when the queue is non-empty.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartEvent {
    pub run_id: RunStamp,
    pub timestamp_utc: DateTime<Utc>,
    /// Operation codes of every queued item, in processing order.
    pub queued_operations: Vec<String>,
    /// The operation code that will be processed first.
    pub next_operation: Option<String>,
    pub queue_length: usize,
}

impl StartEvent {
    pub fn new(run_id: &RunStamp, snapshot: &QueueSnapshot) -> StartEvent {
        StartEvent {
            run_id: run_id.clone(),
            timestamp_utc: Utc::now(),
            queued_operations: snapshot
                .op_codes()
                .iter()
                .map(|op| op.as_str().to_string())
                .collect(),
            next_operation: snapshot.next_op().map(|op| op.as_str().to_string()),
            queue_length: snapshot.len(),
        }
    }
}

/// Fired once per processed item, success or failure.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionEvent {
    pub run_id: RunStamp,
    pub timestamp_utc: DateTime<Utc>,
    /// Operation code of the item that just finished.
    pub operation: String,
    pub status: ItemStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_path: Option<String>,
    /// Base64-encoded log file contents, present only when the log file
    /// exists and is readable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_content: Option<String>,
    /// Operation codes of the items still in inbound, recomputed after the
    /// item was routed to its terminal location.
    pub remaining_operations: Vec<String>,
    pub next_operation: Option<String>,
    pub remaining_count: usize,
}

impl CompletionEvent {
    pub fn new(
        run_id: &RunStamp,
        operation: &str,
        status: ItemStatus,
        message: impl Into<String>,
        log_path: Option<&str>,
        remaining: &QueueSnapshot,
    ) -> CompletionEvent {
        CompletionEvent {
            run_id: run_id.clone(),
            timestamp_utc: Utc::now(),
            operation: operation.to_string(),
            status,
            message: message.into(),
            log_path: log_path.map(str::to_string),
            log_content: log_path.and_then(read_log_base64),
            remaining_operations: remaining
                .op_codes()
                .iter()
                .map(|op| op.as_str().to_string())
                .collect(),
            next_operation: remaining.next_op().map(|op| op.as_str().to_string()),
            remaining_count: remaining.len(),
        }
    }
}

/// Reads a log file and base64-encodes it; absence is not an error.
fn read_log_base64(path: &str) -> Option<String> {
    match std::fs::read(path) {
        Ok(bytes) => Some(BASE64.encode(bytes)),
        Err(error) => {
            debug!(%error, path, "log file not attached to notification");
            None
        }
    }
}
