//! Read-only snapshots of the inbound queue.
//!
//! A snapshot is the ordered set of payload files currently in inbound,
//! sorted by filename (which sorts by the embedded timestamp prefix for
//! well-formed names). Snapshots only feed notification payloads; they
//! never mutate the queue.

use std::io;
use std::path::Path;

use crate::types::{OpCode, op_code_of};

/// An ordered view of the inbound directory at one instant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueSnapshot {
    items: Vec<String>,
}

impl QueueSnapshot {
    /// Captures the current inbound contents.
    ///
    /// In-progress markers and staging temp files are excluded; everything
    /// else counts as a queued payload, parseable or not. A nonexistent
    /// inbound directory yields an empty snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory exists but cannot be listed.
    pub fn capture(inbound: &Path) -> io::Result<QueueSnapshot> {
        let mut items = Vec::new();

        if inbound.exists() {
            for entry in std::fs::read_dir(inbound)? {
                let entry = entry?;
                if !entry.file_type()?.is_file() {
                    continue;
                }
                let Ok(name) = entry.file_name().into_string() else {
                    continue;
                };
                if super::is_queue_internal(&name) {
                    continue;
                }
                items.push(name);
            }
        }

        items.sort();
        Ok(QueueSnapshot { items })
    }

    /// The queued filenames, in processing order.
    pub fn file_names(&self) -> &[String] {
        &self.items
    }

    /// The operation codes of the queued items, in processing order.
    pub fn op_codes(&self) -> Vec<OpCode> {
        self.items.iter().map(|name| op_code_of(name)).collect()
    }

    /// The operation code of the item that will be processed next.
    pub fn next_op(&self) -> Option<OpCode> {
        self.items.first().map(|name| op_code_of(name))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn snapshot_is_sorted_by_filename() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("fm_payload_20240101130000_BETA_2024-01-01.json"),
            b"{}",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("fm_payload_20240101120000_ACME_2024-01-01.json"),
            b"{}",
        )
        .unwrap();

        let snapshot = QueueSnapshot::capture(dir.path()).unwrap();

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.next_op().unwrap().as_str(), "ACME");
        assert_eq!(
            snapshot
                .op_codes()
                .iter()
                .map(|op| op.as_str().to_string())
                .collect::<Vec<_>>(),
            vec!["ACME", "BETA"]
        );
    }

    #[test]
    fn markers_and_temps_are_invisible() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("fm_payload_20240101120000_ACME_2024-01-01.json"),
            b"{}",
        )
        .unwrap();
        std::fs::write(
            dir.path()
                .join("fm_payload_20240101120000_ACME_2024-01-01.json.proc"),
            b"",
        )
        .unwrap();
        std::fs::write(dir.path().join("half-copied.json.tmp"), b"{").unwrap();

        let snapshot = QueueSnapshot::capture(dir.path()).unwrap();

        assert_eq!(snapshot.len(), 1);
    }

    #[test]
    fn unparseable_names_are_queued_as_unknown() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("oddball.json"), b"{}").unwrap();

        let snapshot = QueueSnapshot::capture(dir.path()).unwrap();

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.next_op().unwrap().as_str(), "Unknown");
    }

    #[test]
    fn missing_inbound_yields_empty_snapshot() {
        let dir = tempdir().unwrap();
        let snapshot = QueueSnapshot::capture(&dir.path().join("nope")).unwrap();
        assert!(snapshot.is_empty());
    }
}
