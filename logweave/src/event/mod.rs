//! Severity model and the log entry value.

pub(crate) mod entry;
pub(crate) mod severity;

pub use entry::{LogEntry, DEFAULT_MODULE};
pub use severity::Severity;
