//! Size-bounded rotation of the active log file.
//!
//! Backups live next to the active file as `<path>.<n>` with `n` strictly
//! increasing across rotations. When the numbered rename fails a timestamped
//! name is tried once. Every failure path keeps some handle open so the
//! caller can go on logging; none of these functions return an error.

use chrono::Local;
use std::ffi::OsString;
use std::fmt::Display;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Rotate `file` if the on-disk size of `path` has reached `max_bytes`.
///
/// A `max_bytes` of zero disables rotation. When `path` no longer exists,
/// because an earlier rotation could not recreate it, it is created again
/// and the new handle replaces `file`. Any other failure to read the size
/// returns the handle untouched.
pub fn ensure_capacity(path: &Path, file: File, max_bytes: u64, max_backups: u32) -> Option<File> {
    if max_bytes == 0 {
        return Some(file);
    }

    let size = match fs::metadata(path) {
        Ok(meta) => meta.len(),
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Some(reattach(path, file)),
        Err(_) => return Some(file),
    };

    if size >= max_bytes {
        rotate(path, file, max_backups)
    } else {
        Some(file)
    }
}

/// Move the active file aside and start a fresh one at `path`.
///
/// Returns `None` only when no file at all could be opened afterwards.
pub fn rotate(path: &Path, file: File, max_backups: u32) -> Option<File> {
    let mut file = file;
    let _ = file.flush();
    drop(file);

    let numbered = backup_indices(path)
        .last()
        .copied()
        .unwrap_or(0)
        .checked_add(1)
        .map(|next| backup_path(path, next));

    let renamed = match numbered {
        Some(numbered) => match fs::rename(path, &numbered) {
            Ok(()) => Some(numbered),
            Err(e) => {
                log::warn!(
                    "Renaming {} to {} failed: {e}",
                    path.display(),
                    numbered.display()
                );
                None
            }
        },
        None => {
            log::warn!("Backup numbers for {} are exhausted", path.display());
            None
        }
    };

    let backup = match renamed {
        Some(backup) => backup,
        None => match rename_stamped(path) {
            Ok(stamped) => stamped,
            Err(handle) => return handle,
        },
    };

    let active = match open_truncate(path) {
        Ok(mut f) => {
            let _ = writeln!(f, "[ROTATED] previous log moved to {}", backup.display());
            let _ = f.flush();
            Some(f)
        }
        Err(e) => {
            log::error!("Cannot create new log file {}: {e}", path.display());
            reopen_with_marker(
                &backup,
                &format!(
                    "[ROTATE FAILED] cannot create new log file {}: {e}",
                    path.display()
                ),
            )
        }
    };

    enforce_retention(path, max_backups);
    active
}

fn reattach(path: &Path, file: File) -> File {
    match open_append(path) {
        Ok(fresh) => {
            log::info!("Recreated log file {}", path.display());
            fresh
        }
        Err(e) => {
            log::warn!("Still cannot create log file {}: {e}", path.display());
            file
        }
    }
}

/// Second-chance rename to `<path>.<timestamp>`. On failure the active file
/// is reopened in place and handed back as the error.
fn rename_stamped(path: &Path) -> Result<PathBuf, Option<File>> {
    let stamped = backup_path(path, Local::now().format("%Y%m%d-%H%M%S"));
    match fs::rename(path, &stamped) {
        Ok(()) => Ok(stamped),
        Err(e) => {
            log::error!("Log rotation of {} failed: {e}", path.display());
            Err(reopen_with_marker(
                path,
                &format!("[ROTATE FAILED] continuing in current file: {e}"),
            ))
        }
    }
}

/// Numeric suffixes of the existing `<path>.<n>` backups, ascending.
pub fn backup_indices(path: &Path) -> Vec<u64> {
    let mut indices: Vec<u64> = scan_backups(path).into_iter().map(|(n, _)| n).collect();
    indices.sort_unstable();
    indices
}

/// `<path>.<suffix>`, keeping non-UTF-8 paths intact.
pub fn backup_path(path: &Path, suffix: impl Display) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_os_string();
    name.push(format!(".{suffix}"));
    PathBuf::from(name)
}

pub(crate) fn open_append(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

fn open_truncate(path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
}

fn reopen_with_marker(path: &Path, marker: &str) -> Option<File> {
    match open_append(path) {
        Ok(mut f) => {
            let _ = writeln!(f, "{marker}");
            let _ = f.flush();
            Some(f)
        }
        Err(e) => {
            log::error!("Cannot reopen {}: {e}", path.display());
            None
        }
    }
}

/// Delete the lowest-numbered backups until at most `max_backups` remain.
/// Zero means unlimited.
fn enforce_retention(path: &Path, max_backups: u32) {
    if max_backups == 0 {
        return;
    }

    let mut backups = scan_backups(path);
    let keep = max_backups as usize;
    if backups.len() <= keep {
        return;
    }

    backups.sort_unstable_by_key(|(n, _)| *n);
    let excess = backups.len() - keep;
    for (_, old) in backups.into_iter().take(excess) {
        if let Err(e) = fs::remove_file(&old) {
            log::warn!("Cannot remove old log {}: {e}", old.display());
        }
    }
}

fn scan_backups(path: &Path) -> Vec<(u64, PathBuf)> {
    let Some(base) = path.file_name().and_then(|n| n.to_str()) else {
        return Vec::new();
    };
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };

    entries
        .flatten()
        .filter(|entry| entry.file_type().is_ok_and(|t| t.is_file()))
        .filter_map(|entry| {
            let name = entry.file_name();
            let index = name
                .to_str()?
                .strip_prefix(base)?
                .strip_prefix('.')
                .filter(|s| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()))?
                .parse::<u64>()
                .ok()?;
            Some((index, entry.path()))
        })
        .collect()
}
