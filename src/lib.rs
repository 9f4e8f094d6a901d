//! payspool - a durable, crash-tolerant local payload queue.
//!
//! Payload files arrive in an inbound directory, are deduplicated by their
//! embedded `(operation code, week)` key, run one at a time through an
//! external worker process, and land in archive or failed. Progress events
//! are posted to an external observer. The engine is single-threaded,
//! synchronous, and poll-driven: an external scheduler invokes one tick at
//! a time.

pub mod config;
pub mod notify;
pub mod queue;
pub mod run;
pub mod types;
pub mod worker;
