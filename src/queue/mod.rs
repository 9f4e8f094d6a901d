//! The filesystem payload queue.
//!
//! The queue is a set of plain directories; their contents are the only
//! persisted state (plus the retention stamp):
//!
//! ```text
//! inbound/<name>.json          - pending payload
//! inbound/<name>.json.proc     - in-progress marker (empty: drain claimed it)
//! archive/duplicate_<name>     - deduplicated away before processing
//! archive/processed_<ts>_<name>- drained successfully
//! archive/result_<ts>_<name>   - the worker's result record for that item
//! failed/failed_<ts>_<name>    - drained unsuccessfully; manual re-submission only
//! ```
//!
//! A payload is never deleted without first landing in archive or failed,
//! and nothing in this module ever moves a file back into inbound: the
//! inbound directory only shrinks here (it grows through [`fetch`] or an
//! external producer).
//!
//! # Crash Safety
//!
//! Files the queue writes itself (fetched payloads, result records) go
//! through write-temp-then-rename. A process kill mid-item leaves the
//! payload in inbound together with its `.proc` marker; the next tick logs
//! the interruption, clears the marker, and processes the payload again.

pub mod dedupe;
pub mod drain;
pub mod fetch;
pub mod retention;
pub mod snapshot;

pub use dedupe::deduplicate;
pub use drain::{DrainError, DrainReport, Drainer};
pub use fetch::fetch_new_payloads;
pub use retention::{SweepReport, sweep};
pub use snapshot::QueueSnapshot;

use std::io;
use std::path::Path;

/// Moves a file, copying across filesystems if a plain rename fails.
///
/// The copy-then-delete fallback keeps the guarantee that a payload exists
/// somewhere at every instant; if the trailing delete fails, the file is
/// visible in both places and the caller's warning makes that auditable.
pub(crate) fn move_file(src: &Path, dst: &Path) -> io::Result<()> {
    match std::fs::rename(src, dst) {
        Ok(()) => Ok(()),
        Err(_) => {
            std::fs::copy(src, dst)?;
            std::fs::remove_file(src)
        }
    }
}

/// Marker and staging suffixes that hide a file from queue listings.
pub(crate) fn is_queue_internal(file_name: &str) -> bool {
    file_name.ends_with(".proc") || file_name.ends_with(".tmp")
}
