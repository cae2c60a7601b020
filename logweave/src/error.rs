//! Error types for the logging core.
//!
//! Nothing here is fatal to the host: every variant describes a destination
//! or a plugin that was lost, never the ability to keep publishing.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LogError>;

#[derive(Debug, Error)]
pub enum LogError {
    /// The log file could not be created or opened for appending.
    #[error("cannot open log file {path}: {source}")]
    FileOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The native image could not be opened.
    #[error("failed to load plugin image {path}: {reason}")]
    ImageLoad { path: PathBuf, reason: String },

    /// A required entry point is missing from the image.
    #[error("plugin {plugin} does not export `{symbol}`")]
    MissingSymbol { plugin: String, symbol: &'static str },

    /// A plugin with the same name is already loaded.
    #[error("plugin {name} is already loaded")]
    DuplicateName { name: String },

    /// The plugin's init entry point returned a non-zero status.
    #[error("plugin {name} rejected initialization with status {code}")]
    InitRejected { name: String, code: i32 },

    #[error("no plugin named {name}")]
    PluginNotFound { name: String },

    #[error("cannot read configuration {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {source}")]
    ConfigParse {
        #[from]
        source: serde_json::Error,
    },
}
