//! Explicit outcomes for operations that are allowed to fail.
//!
//! Several steps in a tick are expected to fail occasionally and must never
//! abort the run: notification POSTs, remote-original deletion after a
//! verified copy, stale-file deletion during a sweep. Returning a hard
//! error type from those would invite `?` at call sites; returning `()`
//! would hide that anything can go wrong. [`BestEffort`] sits in between:
//! the failure has already been logged, and the caller decides only whether
//! to count it.

use std::fmt;

use tracing::warn;

/// The outcome of a best-effort operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "best-effort failures are expected; acknowledge the outcome"]
pub enum BestEffort {
    /// The operation completed.
    Done,
    /// The operation was not attempted (e.g. endpoint not configured).
    Skipped,
    /// The operation was attempted and failed; a warning has been logged.
    Failed,
}

impl BestEffort {
    /// Converts a hard result into a best-effort outcome, logging the
    /// failure with the given context.
    pub fn from_result<T, E: fmt::Display>(result: Result<T, E>, context: &str) -> BestEffort {
        match result {
            Ok(_) => BestEffort::Done,
            Err(error) => {
                warn!(%error, "{context} failed");
                BestEffort::Failed
            }
        }
    }

    pub fn is_done(self) -> bool {
        matches!(self, BestEffort::Done)
    }

    pub fn is_failed(self) -> bool {
        matches!(self, BestEffort::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_maps_to_done() {
        let outcome = BestEffort::from_result(Ok::<_, std::io::Error>(5), "test op");
        assert!(outcome.is_done());
        assert!(!outcome.is_failed());
    }

    #[test]
    fn err_maps_to_failed() {
        let result: Result<(), _> = Err(std::io::Error::other("boom"));
        let outcome = BestEffort::from_result(result, "test op");
        assert!(outcome.is_failed());
    }
}
