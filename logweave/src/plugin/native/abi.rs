//! C-compatible types shared with native plugin images.
//!
//! A plugin image exports `plugin_init`, `plugin_process` and
//! `plugin_shutdown`, and may export `plugin_info`. Strings handed to the
//! plugin are NUL-terminated UTF-8 and valid only for the duration of the
//! call, except configuration strings, which live until the plugin is
//! unloaded.

use std::os::raw::{c_char, c_int, c_ulong, c_void};

pub const INIT_SYMBOL: &str = "plugin_init";
pub const PROCESS_SYMBOL: &str = "plugin_process";
pub const SHUTDOWN_SYMBOL: &str = "plugin_shutdown";
pub const INFO_SYMBOL: &str = "plugin_info";

/// Kind values for [`CPluginInfo::kind`].
pub const KIND_FILTER: c_int = 0;
pub const KIND_SINK: c_int = 1;
pub const KIND_ANALYSIS: c_int = 2;
pub const KIND_LANGUAGE_RESOURCE: c_int = 3;

/// Mode values for [`CPluginInfo::mode`].
pub const MODE_SYNC: c_int = 0;
pub const MODE_ASYNC: c_int = 1;

/// Return codes for `plugin_process`.
pub const RESULT_OK: c_int = 0;
pub const RESULT_ERROR: c_int = 1;
pub const RESULT_SKIP: c_int = 2;
pub const RESULT_RETRY: c_int = 3;

#[repr(C)]
#[derive(Debug)]
pub struct CLogEntry {
    pub timestamp: c_ulong,
    pub level: c_int,
    pub module: *const c_char,
    pub message: *const c_char,
    /// Null when the entry was not published by key.
    pub lang_key: *const c_char,
}

#[repr(C)]
#[derive(Debug)]
pub struct CPluginInfo {
    pub name: *const c_char,
    pub version: *const c_char,
    pub author: *const c_char,
    pub kind: c_int,
    pub mode: c_int,
    pub capabilities: u32,
    pub description: *const c_char,
}

pub type ConfigIntFn = extern "C" fn(*const c_void, *const c_char, c_int) -> c_int;
pub type ConfigStringFn =
    extern "C" fn(*const c_void, *const c_char, *const c_char) -> *const c_char;
pub type ConfigBoolFn = extern "C" fn(*const c_void, *const c_char, bool) -> bool;
pub type ConfigArrayFn =
    extern "C" fn(*const c_void, *const c_char, *mut *const c_char, c_int) -> c_int;

/// Configuration accessors passed to `plugin_init`. Every callback takes
/// `context` as its first argument.
#[repr(C)]
#[derive(Debug)]
pub struct PluginHelpers {
    pub context: *const c_void,
    pub get_config_int: ConfigIntFn,
    pub get_config_string: ConfigStringFn,
    pub get_config_bool: ConfigBoolFn,
    pub get_config_array: ConfigArrayFn,
}

pub type InitFn = unsafe extern "C" fn(*const PluginHelpers) -> c_int;
pub type ProcessFn = unsafe extern "C" fn(*const CLogEntry) -> c_int;
pub type ShutdownFn = unsafe extern "C" fn();
pub type InfoFn = unsafe extern "C" fn() -> *const CPluginInfo;
