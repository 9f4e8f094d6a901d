//! Deduplication of inbound payloads.
//!
//! An upstream producer may drop the same logical work item more than once
//! (a re-export, a retried upload). Payloads sharing an `(operation code,
//! week)` key are the same piece of work; only the earliest one, by the
//! 14-digit timestamp embedded in the name, is worth running. The rest are
//! moved to archive with a `duplicate_` prefix before the drain loop
//! starts.
//!
//! Unrecognized filenames carry no key and pass through untouched.
//!
//! Dedup runs once per tick, not continuously: an item arriving mid-run
//! with a duplicate key is only caught on the next tick. That window is an
//! accepted design boundary of the poll-driven model.

use std::collections::HashMap;
use std::io;
use std::path::Path;

use thiserror::Error;
use tracing::{info, warn};

use crate::types::{OpCode, ParsedName, PayloadName, WeekKey};

use super::snapshot::QueueSnapshot;

/// Errors that can occur while deduplicating.
#[derive(Debug, Error)]
pub enum DedupeError {
    /// The inbound directory could not be listed.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for dedup operations.
pub type Result<T> = std::result::Result<T, DedupeError>;

/// Moves duplicate payloads out of inbound into the archive.
///
/// Within each `(operation code, week)` group the member with the earliest
/// embedded timestamp survives; ties keep filename-listing order. Returns
/// the number of duplicates archived. Individual move failures are logged
/// and skipped; the survivor is unaffected and the straggler is caught on
/// a later tick.
///
/// Running this twice over an unchanged directory moves nothing the second
/// time.
///
/// # Errors
///
/// Returns an error only if the inbound directory cannot be listed.
pub fn deduplicate(inbound: &Path, archive: &Path) -> Result<usize> {
    let snapshot = QueueSnapshot::capture(inbound)?;

    let mut groups: HashMap<(OpCode, WeekKey), Vec<PayloadName>> = HashMap::new();
    for file_name in snapshot.file_names() {
        if let ParsedName::Parsed(name) = ParsedName::parse(file_name) {
            groups.entry(name.dedupe_key()).or_default().push(name);
        }
    }

    let mut moved = 0;

    for ((op, week), mut members) in groups {
        if members.len() < 2 {
            continue;
        }

        // Stable sort: equal timestamps keep the filename-listing order,
        // so the survivor is deterministic.
        members.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));

        for duplicate in &members[1..] {
            let src = inbound.join(&duplicate.file_name);
            let dst = archive.join(format!("duplicate_{}", duplicate.file_name));
            match super::move_file(&src, &dst) {
                Ok(()) => {
                    moved += 1;
                    info!(
                        op = %op,
                        week = %week,
                        name = %duplicate.file_name,
                        "archived duplicate payload"
                    );
                }
                Err(error) => {
                    warn!(%error, name = %duplicate.file_name, "failed to archive duplicate");
                }
            }
        }
    }

    Ok(moved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::tempdir;

    fn touch(dir: &Path, name: &str) {
        std::fs::write(dir.join(name), b"{}").unwrap();
    }

    fn names_in(dir: &Path) -> Vec<String> {
        let mut names: Vec<_> = std::fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.unwrap().file_name().into_string().ok())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn earliest_timestamp_survives() {
        let inbound = tempdir().unwrap();
        let archive = tempdir().unwrap();
        touch(inbound.path(), "fm_payload_20240101120000_ACME_2024-01-01.json");
        touch(inbound.path(), "fm_payload_20240101130000_ACME_2024-01-01.json");

        let moved = deduplicate(inbound.path(), archive.path()).unwrap();

        assert_eq!(moved, 1);
        assert_eq!(
            names_in(inbound.path()),
            vec!["fm_payload_20240101120000_ACME_2024-01-01.json"]
        );
        assert_eq!(
            names_in(archive.path()),
            vec!["duplicate_fm_payload_20240101130000_ACME_2024-01-01.json"]
        );
    }

    #[test]
    fn distinct_keys_are_untouched() {
        let inbound = tempdir().unwrap();
        let archive = tempdir().unwrap();
        touch(inbound.path(), "fm_payload_20240101120000_ACME_2024-01-01.json");
        touch(inbound.path(), "fm_payload_20240101130000_ACME_2024-01-08.json");
        touch(inbound.path(), "fm_payload_20240101140000_BETA_2024-01-01.json");

        let moved = deduplicate(inbound.path(), archive.path()).unwrap();

        assert_eq!(moved, 0);
        assert_eq!(names_in(inbound.path()).len(), 3);
    }

    #[test]
    fn unrecognized_names_pass_through() {
        let inbound = tempdir().unwrap();
        let archive = tempdir().unwrap();
        touch(inbound.path(), "oddball.json");
        touch(inbound.path(), "oddball-copy.json");

        let moved = deduplicate(inbound.path(), archive.path()).unwrap();

        assert_eq!(moved, 0);
        assert_eq!(names_in(inbound.path()).len(), 2);
    }

    #[test]
    fn equal_timestamps_keep_listing_order() {
        let inbound = tempdir().unwrap();
        let archive = tempdir().unwrap();
        // Same key, same timestamp, different prefixes: the filename that
        // sorts first survives.
        touch(inbound.path(), "aa_20240101120000_ACME_2024-01-01.json");
        touch(inbound.path(), "bb_20240101120000_ACME_2024-01-01.json");

        let moved = deduplicate(inbound.path(), archive.path()).unwrap();

        assert_eq!(moved, 1);
        assert_eq!(
            names_in(inbound.path()),
            vec!["aa_20240101120000_ACME_2024-01-01.json"]
        );
    }

    #[test]
    fn second_run_is_a_no_op() {
        let inbound = tempdir().unwrap();
        let archive = tempdir().unwrap();
        touch(inbound.path(), "fm_payload_20240101120000_ACME_2024-01-01.json");
        touch(inbound.path(), "fm_payload_20240101130000_ACME_2024-01-01.json");
        touch(inbound.path(), "fm_payload_20240101140000_ACME_2024-01-01.json");

        let first = deduplicate(inbound.path(), archive.path()).unwrap();
        let second = deduplicate(inbound.path(), archive.path()).unwrap();

        assert_eq!(first, 2);
        assert_eq!(second, 0);
    }

    proptest! {
        /// After dedup, exactly one member of each key group remains in
        /// inbound, and a second run moves nothing.
        #[test]
        fn one_survivor_per_group(
            hours in prop::collection::btree_set(10u32..20, 1..6),
            ops in prop::collection::btree_set("[A-Z]{3,6}", 1..4),
        ) {
            let inbound = tempdir().unwrap();
            let archive = tempdir().unwrap();

            let mut expected_groups = 0;
            for op in &ops {
                expected_groups += 1;
                for hour in &hours {
                    touch(
                        inbound.path(),
                        &format!("fm_payload_20240101{hour:02}0000_{op}_2024-01-01.json"),
                    );
                }
            }

            let moved = deduplicate(inbound.path(), archive.path()).unwrap();
            prop_assert_eq!(moved, ops.len() * (hours.len() - 1));
            prop_assert_eq!(names_in(inbound.path()).len(), expected_groups);

            // Idempotence.
            let again = deduplicate(inbound.path(), archive.path()).unwrap();
            prop_assert_eq!(again, 0);

            // The survivor of each group carries the earliest hour.
            let earliest = hours.iter().min().unwrap();
            let earliest_stamp = format!("20240101{:02}0000", earliest);
            for name in names_in(inbound.path()) {
                prop_assert!(name.contains(&earliest_stamp));
            }
        }
    }
}
