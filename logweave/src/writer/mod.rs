//! Level-gated writer with console output and a rotating log file.
//!
//! All writer state sits behind one mutex. A single `emit` holds it from the
//! threshold check through the rotation decision to the final flush, so two
//! threads can never both rotate the same file and no line lands in a file
//! that is being moved aside.

pub mod rotate;

use crate::error::{LogError, Result};
use crate::event::{LogEntry, Severity};
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;
pub const DEFAULT_MAX_BACKUPS: u32 = 5;

struct WriterState {
    threshold: Severity,
    console_enabled: bool,
    console_color: bool,
    console: Box<dyn Write + Send>,
    file_path: Option<PathBuf>,
    open_file: Option<File>,
    max_bytes: u64,
    max_backups: u32,
}

impl WriterState {
    fn close_file(&mut self) {
        if let Some(mut file) = self.open_file.take() {
            let _ = file.flush();
        }
        self.file_path = None;
    }

    fn write_console(&mut self, entry: &LogEntry) {
        let line = entry.format_line(self.console_color);
        let _ = writeln!(self.console, "{line}");
        let _ = self.console.flush();
    }

    /// Returns the write error, if any, so it can be reported once the lock is released.
    fn write_file(&mut self, entry: &LogEntry) -> Option<io::Error> {
        let file = self.open_file.take()?;
        self.open_file = match &self.file_path {
            Some(path) => rotate::ensure_capacity(path, file, self.max_bytes, self.max_backups),
            None => Some(file),
        };

        let file = self.open_file.as_mut()?;
        writeln!(file, "{entry}").and_then(|()| file.flush()).err()
    }
}

/// The process's log writer.
///
/// Every setter takes effect for the next `emit` and is safe to call while
/// other threads are emitting.
pub struct LogWriter {
    state: Mutex<WriterState>,
}

impl LogWriter {
    /// Writer printing to stderr with colored levels.
    pub fn new(threshold: Severity, console_enabled: bool) -> Self {
        Self::build(threshold, console_enabled, true, Box::new(io::stderr()))
    }

    /// Writer whose console output goes to `console` instead of stderr, uncolored.
    pub fn with_console(threshold: Severity, console: Box<dyn Write + Send>) -> Self {
        Self::build(threshold, true, false, console)
    }

    fn build(
        threshold: Severity,
        console_enabled: bool,
        console_color: bool,
        console: Box<dyn Write + Send>,
    ) -> Self {
        Self {
            state: Mutex::new(WriterState {
                threshold,
                console_enabled,
                console_color,
                console,
                file_path: None,
                open_file: None,
                max_bytes: DEFAULT_MAX_FILE_SIZE,
                max_backups: DEFAULT_MAX_BACKUPS,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, WriterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn should_emit(&self, level: Severity) -> bool {
        level >= self.lock().threshold
    }

    /// Write `entry` to the console and the log file, unless it is below the threshold.
    pub fn emit(&self, entry: &LogEntry) {
        let write_error = {
            let mut state = self.lock();
            if entry.level < state.threshold {
                return;
            }
            if state.console_enabled {
                state.write_console(entry);
            }
            state.write_file(entry)
        };

        if let Some(e) = write_error {
            log::warn!("Failed to append to log file: {e}");
        }
    }

    pub fn emit_message(&self, level: Severity, module: Option<&str>, message: &str) {
        if !self.should_emit(level) {
            return;
        }
        self.emit(&LogEntry::new(level, module, message));
    }

    pub fn set_level(&self, level: Severity) {
        self.lock().threshold = level;
    }

    pub fn level(&self) -> Severity {
        self.lock().threshold
    }

    pub fn set_console_enabled(&self, enabled: bool) {
        self.lock().console_enabled = enabled;
    }

    pub fn console_enabled(&self) -> bool {
        self.lock().console_enabled
    }

    pub fn set_console_color(&self, enabled: bool) {
        self.lock().console_color = enabled;
    }

    /// Switch file output to `path`, or disable it with `None`.
    ///
    /// Any open file is closed first. If the new file cannot be opened file
    /// output stays disabled; console output is unaffected either way.
    pub fn set_file(&self, path: Option<&Path>) -> Result<()> {
        let opened = {
            let mut state = self.lock();
            state.close_file();

            let Some(path) = path else {
                return Ok(());
            };

            rotate::open_append(path).map(|file| {
                state.file_path = Some(path.to_path_buf());
                state.open_file = Some(file);
            })
        };

        opened.map_err(|source| {
            let path = path.map(Path::to_path_buf).unwrap_or_default();
            log::warn!(
                "Cannot open log file {}, file output disabled: {source}",
                path.display()
            );
            LogError::FileOpen { path, source }
        })
    }

    pub fn file_path(&self) -> Option<PathBuf> {
        self.lock().file_path.clone()
    }

    pub fn set_max_size(&self, max_bytes: u64) {
        self.lock().max_bytes = max_bytes;
    }

    pub fn max_size(&self) -> u64 {
        self.lock().max_bytes
    }

    pub fn set_max_backups(&self, count: u32) {
        self.lock().max_backups = count;
    }

    pub fn max_backups(&self) -> u32 {
        self.lock().max_backups
    }

    /// Force a rotation of the active file.
    ///
    /// Returns `false` when file output is disabled or no handle could be
    /// reopened afterwards.
    pub fn rotate_now(&self) -> bool {
        let mut state = self.lock();
        let (Some(path), Some(file)) = (state.file_path.clone(), state.open_file.take()) else {
            return false;
        };

        let max_backups = state.max_backups;
        state.open_file = rotate::rotate(&path, file, max_backups);
        state.open_file.is_some()
    }

    /// Close the log file and disable file output.
    pub fn close(&self) {
        self.lock().close_file();
    }
}

impl Default for LogWriter {
    fn default() -> Self {
        Self::new(Severity::Info, true)
    }
}

/// Cloneable in-memory console target.
///
/// Hand one clone to [`LogWriter::with_console`] and read the other.
#[derive(Clone, Default)]
pub struct CaptureBuffer {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl CaptureBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        let bytes = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&bytes).into_owned()
    }

    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }
}

impl Write for CaptureBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
