/// Log entry value passed through the pipeline
use crate::event::severity::Severity;
use chrono::{Local, TimeZone};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Module tag used when the caller does not supply one.
pub const DEFAULT_MODULE: &str = "SYSTEM";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const RESET_COLOR: &str = "\x1B[0m";

/// One logged event.
///
/// Entries are built once per publish call and handed to the writer and to
/// plugins by shared reference; nothing downstream mutates them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Seconds since the Unix epoch
    pub timestamp: u64,
    pub level: Severity,
    pub module: String,
    /// Fully rendered message text
    pub message: String,
    /// Translation key the message was rendered from, if any
    pub diagnostic_key: Option<String>,
}

impl LogEntry {
    /// Create an entry stamped with the current time.
    pub fn new(level: Severity, module: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            timestamp: now_secs(),
            level,
            module: module
                .filter(|m| !m.is_empty())
                .unwrap_or(DEFAULT_MODULE)
                .to_string(),
            message: message.into(),
            diagnostic_key: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: u64) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_diagnostic_key(mut self, key: impl Into<String>) -> Self {
        self.diagnostic_key = Some(key.into());
        self
    }

    pub fn debug(module: Option<&str>, message: impl Into<String>) -> Self {
        Self::new(Severity::Debug, module, message)
    }

    pub fn info(module: Option<&str>, message: impl Into<String>) -> Self {
        Self::new(Severity::Info, module, message)
    }

    pub fn warn(module: Option<&str>, message: impl Into<String>) -> Self {
        Self::new(Severity::Warn, module, message)
    }

    pub fn error(module: Option<&str>, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, module, message)
    }

    /// Render the timestamp in local time, or the raw epoch seconds if it is out of range.
    pub fn formatted_time(&self) -> String {
        i64::try_from(self.timestamp)
            .ok()
            .and_then(|secs| Local.timestamp_opt(secs, 0).single())
            .map(|t| t.format(TIMESTAMP_FORMAT).to_string())
            .unwrap_or_else(|| self.timestamp.to_string())
    }

    /// `[timestamp][LEVEL][module] message`, optionally with the message
    /// wrapped in the level's ANSI color. Colored output is for consoles only.
    pub fn format_line(&self, color: bool) -> String {
        if color {
            format!(
                "[{}][{}][{}] {}{}{}",
                self.formatted_time(),
                self.level,
                self.module,
                self.level.color(),
                self.message,
                RESET_COLOR
            )
        } else {
            self.to_string()
        }
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}][{}][{}] {}",
            self.formatted_time(),
            self.level,
            self.module,
            self.message
        )
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
