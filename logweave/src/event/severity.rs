/// Severity levels for log entries
use std::fmt;
use std::str::FromStr;
use strum_macros::{EnumIter, EnumString};

/// Log severity levels, ordered from least to most severe.
///
/// The discriminants double as the numeric level passed across the plugin ABI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, EnumString, EnumIter)]
#[strum(ascii_case_insensitive)]
pub enum Severity {
    #[strum(serialize = "DEBUG")]
    Debug = 0,
    #[default]
    #[strum(serialize = "INFO")]
    Info = 1,
    #[strum(serialize = "WARN", serialize = "WARNING")]
    Warn = 2,
    #[strum(serialize = "ERROR")]
    Error = 3,
    #[strum(serialize = "FATAL")]
    Fatal = 4,
}

impl Severity {
    /// Parse a configured level name, falling back to `Info` for anything unrecognised.
    pub fn from_config(value: &str) -> Self {
        Severity::from_str(value.trim()).unwrap_or_default()
    }

    /// Upper-case name used in the emitted line.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
            Severity::Fatal => "FATAL",
        }
    }

    /// ANSI color for console decoration.
    pub(crate) fn color(&self) -> &'static str {
        match self {
            Severity::Debug => "\x1B[36m",
            Severity::Info => "\x1B[32m",
            Severity::Warn => "\x1B[33m",
            Severity::Error => "\x1B[31m",
            Severity::Fatal => "\x1B[35m",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
