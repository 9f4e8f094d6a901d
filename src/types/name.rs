//! The payload filename parser.
//!
//! Payload files are named `prefix_<14-digit-timestamp>_<opCode>_<YYYY-MM-DD>.json`:
//!
//! ```text
//! fm_payload_20240101120000_ACME_2024-01-01.json
//! ^prefix    ^timestamp     ^op  ^week key
//! ```
//!
//! The timestamp is the payload's creation instant and sorts lexically; the
//! operation code is free text (it may itself contain underscores); the week
//! key is the last underscore-separated segment before the extension. The
//! timestamp is located as the *first* underscore-delimited 14-digit run, so
//! a prefix never swallows it.
//!
//! Every consumer of filenames (fetch, dedup, snapshot, drain) goes through
//! [`ParsedName::parse`]; there is exactly one place that knows the format.
//! Names that do not match are [`ParsedName::Unrecognized`]: they still flow
//! through the queue, but report the operation code "Unknown" and never
//! participate in dedup grouping.

use crate::types::ids::{OpCode, WeekKey};

/// A payload filename that matched the expected structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadName {
    /// The full filename, kept for moves and display.
    pub file_name: String,
    /// The embedded 14-digit creation timestamp (lexically sortable).
    pub timestamp: String,
    /// The logical operation code.
    pub op_code: OpCode,
    /// The processing-week date.
    pub week: WeekKey,
}

impl PayloadName {
    /// The dedup grouping key: payloads with the same operation code and
    /// week are logically the same piece of work.
    pub fn dedupe_key(&self) -> (OpCode, WeekKey) {
        (self.op_code.clone(), self.week)
    }
}

/// The outcome of parsing a filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedName {
    /// The name matched the payload structure.
    Parsed(PayloadName),
    /// The name did not match; the item is processed but not deduplicated.
    Unrecognized,
}

impl ParsedName {
    /// Parses a filename against the payload structure.
    pub fn parse(file_name: &str) -> ParsedName {
        match try_parse(file_name) {
            Some(parsed) => ParsedName::Parsed(parsed),
            None => ParsedName::Unrecognized,
        }
    }

    /// The operation code to report for this name ("Unknown" if unparsed).
    pub fn op_code(&self) -> OpCode {
        match self {
            ParsedName::Parsed(name) => name.op_code.clone(),
            ParsedName::Unrecognized => OpCode::unknown(),
        }
    }

    /// Returns the parsed name, if the filename matched.
    pub fn parsed(&self) -> Option<&PayloadName> {
        match self {
            ParsedName::Parsed(name) => Some(name),
            ParsedName::Unrecognized => None,
        }
    }
}

/// The operation code for an arbitrary inbound filename.
pub fn op_code_of(file_name: &str) -> OpCode {
    ParsedName::parse(file_name).op_code()
}

fn try_parse(file_name: &str) -> Option<PayloadName> {
    let stem = file_name.strip_suffix(".json")?;

    // The week key is the last underscore-separated segment.
    let (head, week_str) = stem.rsplit_once('_')?;
    let week = WeekKey::parse(week_str)?;

    // The timestamp is the first `_<14 digits>_` run in what remains.
    // Scanning forward keeps the prefix minimal, so a prefix containing
    // digits cannot absorb the timestamp.
    let bytes = head.as_bytes();
    for i in 1..bytes.len().saturating_sub(16) {
        if bytes[i] == b'_'
            && bytes[i + 15] == b'_'
            && bytes[i + 1..i + 15].iter().all(u8::is_ascii_digit)
        {
            let timestamp = head[i + 1..i + 15].to_string();
            let op = &head[i + 16..];
            if op.is_empty() {
                return None;
            }
            return Some(PayloadName {
                file_name: file_name.to_string(),
                timestamp,
                op_code: OpCode::new(op),
                week,
            });
        }
    }

    None
}
