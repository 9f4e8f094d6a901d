//! Retention sweep for aged queue artifacts.
//!
//! Archive, failed, and log directories grow without bound unless purged.
//! The sweep deletes files older than a maximum age, but is throttled by a
//! stamp file: it only runs when the stamp is missing or older than the
//! minimum interval, and the stamp is refreshed after every sweep that
//! runs. The two ages are independent: a weekly sweep enforcing a
//! two-week retention is the default.
//!
//! Every deletion is best-effort. A locked or already-deleted file must
//! not abort the sweep, and sweep trouble never surfaces beyond a log
//! line.

use std::path::Path;
use std::time::{Duration, SystemTime};

use chrono::Utc;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

const SECS_PER_DAY: u64 = 24 * 60 * 60;

/// What a sweep invocation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SweepReport {
    /// Whether the sweep ran at all (false: throttled by the stamp).
    pub ran: bool,
    /// Number of files deleted.
    pub deleted: usize,
}

/// Purges files older than `max_age_days` from `dirs`, recursively.
///
/// Runs only if `stamp` is absent or was last written more than
/// `min_interval_days` ago; after running, the stamp is rewritten.
pub fn sweep(
    dirs: &[&Path],
    max_age_days: u64,
    stamp: &Path,
    min_interval_days: u64,
) -> SweepReport {
    if !sweep_due(stamp, min_interval_days) {
        debug!(stamp = %stamp.display(), "retention sweep not due yet");
        return SweepReport::default();
    }

    let cutoff = SystemTime::now()
        .checked_sub(Duration::from_secs(max_age_days * SECS_PER_DAY))
        .unwrap_or(SystemTime::UNIX_EPOCH);

    let mut deleted = 0;
    for dir in dirs {
        deleted += sweep_dir(dir, cutoff);
    }

    refresh_stamp(stamp);
    info!(deleted, max_age_days, "retention sweep completed");

    SweepReport { ran: true, deleted }
}

/// Checks the stamp's last-write time against the minimum interval.
///
/// An unreadable stamp counts as absent: sweeping too often is the safer
/// failure mode, since the age check still protects young files.
fn sweep_due(stamp: &Path, min_interval_days: u64) -> bool {
    let Ok(modified) = stamp.metadata().and_then(|m| m.modified()) else {
        return true;
    };
    match SystemTime::now().duration_since(modified) {
        Ok(age) => age >= Duration::from_secs(min_interval_days * SECS_PER_DAY),
        // Stamp from the future (clock skew): treat as fresh.
        Err(_) => false,
    }
}

fn sweep_dir(dir: &Path, cutoff: SystemTime) -> usize {
    let mut deleted = 0;

    for entry in WalkDir::new(dir).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        let Ok(modified) = metadata.modified() else {
            continue;
        };
        if modified >= cutoff {
            continue;
        }
        match std::fs::remove_file(entry.path()) {
            Ok(()) => deleted += 1,
            Err(error) => {
                debug!(%error, path = %entry.path().display(), "could not delete aged file");
            }
        }
    }

    deleted
}

fn refresh_stamp(stamp: &Path) {
    if let Err(error) = std::fs::write(stamp, Utc::now().to_rfc3339()) {
        warn!(%error, stamp = %stamp.display(), "failed to refresh retention stamp");
    }
}
