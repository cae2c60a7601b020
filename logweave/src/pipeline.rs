//! The publishing front door: level gate, filters, writer, sinks, analysers.

use crate::config::LoggingConfig;
use crate::event::{LogEntry, Severity};
use crate::lang::{Catalog, Translator, DEFAULT_LOCALE};
use crate::plugin::PluginRegistry;
use crate::writer::LogWriter;

/// Owns the writer and the plugin registry and runs every entry through
/// them in a fixed order.
///
/// The writer and registry are locked one after the other, never together.
/// `Logger` is `Send + Sync`; share it through an `Arc`.
pub struct Logger {
    writer: LogWriter,
    plugins: PluginRegistry,
    translator: Box<dyn Translator>,
}

impl Logger {
    pub fn new(writer: LogWriter, plugins: PluginRegistry) -> Self {
        Logger {
            writer,
            plugins,
            translator: Box::new(Catalog::new(DEFAULT_LOCALE)),
        }
    }

    /// Build a writer and a registry from `config`, with an empty catalog for
    /// `config.language`. Plugins are not loaded until
    /// `plugins().scan_and_load()` is called. A log file that cannot be opened
    /// leaves the logger console-only.
    pub fn from_config(config: &LoggingConfig) -> Self {
        let writer = LogWriter::new(config.level(), config.log.console);
        writer.set_max_size(config.log.max_size);
        writer.set_max_backups(config.log.max_backups);
        if let Some(path) = config.log_file() {
            if let Err(e) = writer.set_file(Some(path)) {
                log::warn!("Continuing without a log file: {e}");
            }
        }

        Logger::new(writer, PluginRegistry::new(config.plugin_settings()))
            .with_translator(Box::new(Catalog::new(&config.language)))
    }

    pub fn with_translator(mut self, translator: Box<dyn Translator>) -> Self {
        self.translator = translator;
        self
    }

    /// Locale of the installed translator.
    pub fn locale(&self) -> &str {
        self.translator.locale()
    }

    pub fn writer(&self) -> &LogWriter {
        &self.writer
    }

    pub fn plugins(&self) -> &PluginRegistry {
        &self.plugins
    }

    pub fn publish(&self, level: Severity, module: Option<&str>, message: &str) {
        if !self.writer.should_emit(level) {
            return;
        }
        self.dispatch(&LogEntry::new(level, module, message));
    }

    pub fn publish_entry(&self, entry: LogEntry) {
        if !self.writer.should_emit(entry.level) {
            return;
        }
        self.dispatch(&entry);
    }

    /// Publish the translation of `key`, or the key itself when no
    /// translation exists. The key travels with the entry.
    pub fn publish_key(&self, level: Severity, module: Option<&str>, key: &str) {
        if !self.writer.should_emit(level) {
            return;
        }
        let message = self
            .translator
            .lookup(key)
            .unwrap_or_else(|| key.to_string());
        self.dispatch(&LogEntry::new(level, module, message).with_diagnostic_key(key));
    }

    fn dispatch(&self, entry: &LogEntry) {
        if !self.plugins.filter_pass(entry) {
            return;
        }
        self.writer.emit(entry);
        self.plugins.sink_pass(entry);
        self.plugins.analysis_pass(entry);
    }

    pub fn debug(&self, module: &str, message: &str) {
        self.publish(Severity::Debug, Some(module), message);
    }

    pub fn info(&self, module: &str, message: &str) {
        self.publish(Severity::Info, Some(module), message);
    }

    pub fn warn(&self, module: &str, message: &str) {
        self.publish(Severity::Warn, Some(module), message);
    }

    pub fn error(&self, module: &str, message: &str) {
        self.publish(Severity::Error, Some(module), message);
    }

    pub fn fatal(&self, module: &str, message: &str) {
        self.publish(Severity::Fatal, Some(module), message);
    }

    /// Unload every plugin and close the log file. The console stays usable.
    pub fn shutdown(&self) {
        self.plugins.unload_all();
        self.writer.close();
    }
}
