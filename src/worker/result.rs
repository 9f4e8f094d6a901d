//! The worker's structured result record.

use serde::{Deserialize, Serialize};

/// What the worker reports on stdout for one payload.
///
/// Only the completion flag drives control flow; the log path and exception
/// message feed notifications, and any further worker-specific fields are
/// carried through untouched into the archived result file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultRecord {
    /// Whether the worker considers the item done.
    pub completed: bool,
    /// Path of the worker's log file for this item, if it wrote one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_path: Option<String>,
    /// Human-readable failure description when `completed` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception_message: Option<String>,
    /// Worker-specific fields, preserved verbatim.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ResultRecord {
    /// Parses the worker's stdout into a result record.
    ///
    /// # Errors
    ///
    /// Returns the underlying JSON error when stdout is not a record of the
    /// expected shape; the drain loop classifies that as "invalid output".
    pub fn parse(stdout: &str) -> serde_json::Result<ResultRecord> {
        serde_json::from_str(stdout.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_record() {
        let record = ResultRecord::parse("{\"completed\": true}").unwrap();
        assert!(record.completed);
        assert!(record.log_path.is_none());
        assert!(record.exception_message.is_none());
        assert!(record.extra.is_empty());
    }

    #[test]
    fn parses_failure_record() {
        let record =
            ResultRecord::parse("{\"completed\": false, \"exceptionMessage\": \"bad SCAC\"}")
                .unwrap();
        assert!(!record.completed);
        assert_eq!(record.exception_message.as_deref(), Some("bad SCAC"));
    }

    #[test]
    fn tolerates_surrounding_whitespace() {
        let record = ResultRecord::parse("\n  {\"completed\": true}\n").unwrap();
        assert!(record.completed);
    }

    #[test]
    fn preserves_worker_specific_fields() {
        let record = ResultRecord::parse(
            "{\"completed\": true, \"logPath\": \"/logs/run.log\", \"rowsWritten\": 42}",
        )
        .unwrap();
        assert_eq!(record.log_path.as_deref(), Some("/logs/run.log"));
        assert_eq!(record.extra["rowsWritten"], 42);

        // And round-trips them into the archived result file.
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["rowsWritten"], 42);
        assert_eq!(json["logPath"], "/logs/run.log");
    }

    #[test]
    fn rejects_non_record_output() {
        assert!(ResultRecord::parse("").is_err());
        assert!(ResultRecord::parse("Traceback (most recent call last):").is_err());
        assert!(ResultRecord::parse("[1, 2, 3]").is_err());
        assert!(ResultRecord::parse("{\"done\": true}").is_err());
    }
}
