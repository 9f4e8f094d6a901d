//! Fetching new payloads from the remote drop location.
//!
//! The remote side only needs list/copy/delete semantics (it is typically a
//! sync client's local mirror). Each payload-shaped file is staged into
//! inbound with write-temp-then-rename, the copy is verified, and only then
//! is the remote original deleted. The delete is best-effort: a reader
//! holding a lock on the source must not block ingestion of a copy that
//! already succeeded.
//!
//! An unreachable remote downgrades the whole fetch step to a warning; the
//! rest of the tick proceeds against whatever is already in inbound.

use std::path::Path;

use tracing::{debug, info, warn};

use crate::notify::BestEffort;
use crate::types::ParsedName;

/// Copies new payload files from `remote` into `inbound`.
///
/// Returns the number of payloads landed in inbound. Files whose names do
/// not parse as payload names are left in the remote directory untouched.
pub fn fetch_new_payloads(remote: &Path, inbound: &Path) -> usize {
    let entries = match std::fs::read_dir(remote) {
        Ok(entries) => entries,
        Err(error) => {
            warn!(%error, remote = %remote.display(), "remote drop unreachable, skipping fetch");
            return 0;
        }
    };

    let mut fetched = 0;

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(error) => {
                warn!(%error, "failed to read remote directory entry");
                continue;
            }
        };
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }
        if ParsedName::parse(&name).parsed().is_none() {
            debug!(name, "remote file is not a payload, leaving in place");
            continue;
        }

        let src = entry.path();
        let dst = inbound.join(&name);
        if let Err(error) = stage_copy(&src, &dst) {
            warn!(%error, name, "failed to copy payload from remote");
            continue;
        }
        if !dst.exists() {
            warn!(name, "copied payload missing after rename, keeping remote original");
            continue;
        }

        // The copy is verified; losing the delete only means the same
        // payload is fetched again and deduplicated by name overwrite.
        let _ = BestEffort::from_result(
            std::fs::remove_file(&src),
            "remote original delete",
        );

        fetched += 1;
        debug!(name, "fetched payload");
    }

    if fetched > 0 {
        info!(fetched, "fetched new payloads from remote drop");
    }
    fetched
}

/// Copies `src` to `dst` via a `.tmp` sibling and an atomic rename.
fn stage_copy(src: &Path, dst: &Path) -> std::io::Result<()> {
    let tmp = dst.with_extension("json.tmp");
    std::fs::copy(src, &tmp)?;
    std::fs::rename(&tmp, dst)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const NAME: &str = "fm_payload_20240101120000_ACME_2024-01-01.json";

    #[test]
    fn fetch_copies_verifies_and_deletes() {
        let remote = tempdir().unwrap();
        let inbound = tempdir().unwrap();
        std::fs::write(remote.path().join(NAME), b"{\"k\":1}").unwrap();

        let fetched = fetch_new_payloads(remote.path(), inbound.path());

        assert_eq!(fetched, 1);
        assert!(!remote.path().join(NAME).exists());
        assert_eq!(
            std::fs::read(inbound.path().join(NAME)).unwrap(),
            b"{\"k\":1}"
        );
    }

    #[test]
    fn non_payload_files_stay_remote() {
        let remote = tempdir().unwrap();
        let inbound = tempdir().unwrap();
        std::fs::write(remote.path().join("notes.txt"), b"hello").unwrap();
        std::fs::write(remote.path().join("payload.json"), b"{}").unwrap();

        let fetched = fetch_new_payloads(remote.path(), inbound.path());

        assert_eq!(fetched, 0);
        assert!(remote.path().join("notes.txt").exists());
        assert!(remote.path().join("payload.json").exists());
        assert_eq!(std::fs::read_dir(inbound.path()).unwrap().count(), 0);
    }

    #[test]
    fn unreachable_remote_is_not_fatal() {
        let inbound = tempdir().unwrap();
        let fetched = fetch_new_payloads(Path::new("/no/such/remote"), inbound.path());
        assert_eq!(fetched, 0);
    }

    #[test]
    fn no_temp_files_left_behind() {
        let remote = tempdir().unwrap();
        let inbound = tempdir().unwrap();
        std::fs::write(remote.path().join(NAME), b"{}").unwrap();

        fetch_new_payloads(remote.path(), inbound.path());

        let leftovers: Vec<_> = std::fs::read_dir(inbound.path())
            .unwrap()
            .filter_map(|e| e.unwrap().file_name().into_string().ok())
            .filter(|n| n.ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }
}
