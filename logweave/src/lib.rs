#![deny(unsafe_code)]

//! Leveled logging with size-bounded file rotation and a pipeline of
//! runtime-loaded filter, sink and analysis plugins.

pub mod config;
pub mod error;
pub mod event;
pub mod lang;
pub mod pipeline;
pub mod plugin;
pub mod writer;

pub use crate::config::LoggingConfig;
pub use crate::error::{LogError, Result};
pub use crate::event::{LogEntry, Severity};
pub use crate::pipeline::Logger;
pub use crate::writer::LogWriter;

///
/// Expose all structures required to publish entries and write plugins
///
/// ```
/// use logweave::prelude::*;
/// ```
pub mod prelude {
    pub use crate::lang::{Catalog, Translator};
    pub use crate::plugin::{
        PluginConfig, PluginDescriptor, PluginKind, PluginModule, PluginRegistry, PluginResult,
        PluginSettings,
    };
    pub use crate::{LogEntry, LogError, LogWriter, Logger, LoggingConfig, Severity};
}
