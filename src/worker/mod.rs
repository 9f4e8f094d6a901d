//! The external worker contract.
//!
//! The document-processing worker is an opaque external collaborator. The
//! queue engine depends on exactly three things: the exit code, the stderr
//! text (captured to a temp file for failure notifications), and a
//! structured result record on stdout. Everything else the worker does is
//! its own business.

pub mod gateway;
pub mod result;

pub use gateway::{Invocation, WorkerError, WorkerGateway};
pub use result::ResultRecord;
