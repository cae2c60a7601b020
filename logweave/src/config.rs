//! Configuration record for a [`Logger`](crate::Logger).
//!
//! Loaded from JSON; every field has a default so an empty object is a
//! valid configuration.

use crate::error::{LogError, Result};
use crate::event::Severity;
use crate::lang::DEFAULT_LOCALE;
use crate::plugin::PluginSettings;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

/// Searched when `plugins.paths` is empty.
pub const DEFAULT_PLUGIN_PATH: &str = "/usr/lib/logweave/plugins";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Locale of the catalog `Logger::from_config` installs.
    pub language: String,
    pub log: LogSection,
    pub plugins: PluginSection,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            language: DEFAULT_LOCALE.to_string(),
            log: LogSection::default(),
            plugins: PluginSection::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSection {
    /// Threshold name, parsed leniently; unknown names mean INFO.
    pub level: String,
    /// Empty disables file output.
    pub file: String,
    /// Bytes; zero disables rotation.
    pub max_size: u64,
    /// Numbered backups kept; zero keeps all.
    pub max_backups: u32,
    pub console: bool,
}

impl Default for LogSection {
    fn default() -> Self {
        LogSection {
            level: "INFO".to_string(),
            file: String::new(),
            max_size: 1_048_576,
            max_backups: 5,
            console: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginSection {
    pub paths: Vec<PathBuf>,
    pub enabled: Vec<String>,
    pub disabled: Vec<String>,
    pub order: Vec<String>,
    /// Plugin name to its configuration object.
    pub config: Map<String, Value>,
}

impl LoggingConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| LogError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    pub fn level(&self) -> Severity {
        Severity::from_config(&self.log.level)
    }

    /// The log file, or `None` when file output is disabled.
    pub fn log_file(&self) -> Option<&Path> {
        let file = self.log.file.trim();
        if file.is_empty() {
            None
        } else {
            Some(Path::new(file))
        }
    }

    pub fn plugin_settings(&self) -> PluginSettings {
        let search_paths = if self.plugins.paths.is_empty() {
            vec![PathBuf::from(DEFAULT_PLUGIN_PATH)]
        } else {
            self.plugins.paths.clone()
        };

        PluginSettings {
            search_paths,
            enabled: self.plugins.enabled.clone(),
            disabled: self.plugins.disabled.clone(),
            order: self.plugins.order.clone(),
            configs: self.plugins.config.clone(),
        }
    }
}
