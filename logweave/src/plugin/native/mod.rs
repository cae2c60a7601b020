//! Plugins loaded from shared libraries at runtime.

pub mod abi;

use crate::error::{LogError, Result};
use crate::event::LogEntry;
use crate::plugin::config::int_value;
use crate::plugin::{
    Capabilities, InvocationMode, PluginConfig, PluginDescriptor, PluginKind, PluginModule,
    PluginResult,
};
use abi::{CLogEntry, CPluginInfo, InfoFn, InitFn, PluginHelpers, ProcessFn, ShutdownFn};
use libloading::Library;
use serde_json::Value;
use std::collections::HashMap;
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int, c_ulong, c_void};
use std::path::{Path, PathBuf};
use std::ptr;

/// A loaded plugin image and its resolved entry points.
///
/// The function pointers are only valid while the library is loaded, so it
/// is the last field and is dropped last. The helpers and the table behind
/// their context are handed to the image at init and live as long as it does.
pub struct NativeModule {
    name: String,
    path: PathBuf,
    init_fn: InitFn,
    process_fn: ProcessFn,
    shutdown_fn: ShutdownFn,
    info_fn: Option<InfoFn>,
    _helpers: Option<Box<PluginHelpers>>,
    _config: Option<Box<ConfigTable>>,
    _library: Library,
}

// SAFETY: the raw pointers held in `_helpers` refer to heap data owned by this
// struct, and the registry serializes every call into the image.
unsafe impl Send for NativeModule {}

impl NativeModule {
    /// Open the image at `path` and resolve its entry points. `name` is only
    /// used for diagnostics and as the fallback descriptor name.
    pub fn load(path: &Path, name: &str) -> Result<Self> {
        // SAFETY: opening a library runs its initializers. Plugin directories
        // are trusted by configuration.
        let library = unsafe { Library::new(path) }.map_err(|e| LogError::ImageLoad {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let init_fn = resolve::<InitFn>(&library, name, abi::INIT_SYMBOL)?;
        let process_fn = resolve::<ProcessFn>(&library, name, abi::PROCESS_SYMBOL)?;
        let shutdown_fn = resolve::<ShutdownFn>(&library, name, abi::SHUTDOWN_SYMBOL)?;
        let info_fn = resolve::<InfoFn>(&library, name, abi::INFO_SYMBOL).ok();

        Ok(NativeModule {
            name: name.to_string(),
            path: path.to_path_buf(),
            init_fn,
            process_fn,
            shutdown_fn,
            info_fn,
            _helpers: None,
            _config: None,
            _library: library,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn resolve<T: Copy>(library: &Library, plugin: &str, symbol: &'static str) -> Result<T> {
    // SAFETY: every symbol is looked up with the signature the ABI documents
    // for it, and the copied pointer never outlives the owning module.
    unsafe { library.get::<T>(symbol.as_bytes()) }
        .map(|s| *s)
        .map_err(|_| LogError::MissingSymbol {
            plugin: plugin.to_string(),
            symbol,
        })
}

impl PluginModule for NativeModule {
    fn descriptor(&self) -> Option<PluginDescriptor> {
        let info_fn = self.info_fn?;
        // SAFETY: resolved from the loaded image with the documented signature.
        let info = unsafe { info_fn() };
        // SAFETY: a non-null result points at a descriptor the image keeps
        // alive for as long as it is loaded.
        let Some(info) = (unsafe { info.as_ref() }) else {
            log::warn!("Plugin {} returned no info, synthesizing one", self.name);
            return None;
        };
        Some(copy_info(info, &self.name))
    }

    fn init(&mut self, config: &PluginConfig) -> i32 {
        let table = Box::new(ConfigTable::from_config(config));
        let helpers = Box::new(PluginHelpers {
            context: (&*table as *const ConfigTable).cast::<c_void>(),
            get_config_int: config_int,
            get_config_string: config_string,
            get_config_bool: config_bool,
            get_config_array: config_array,
        });

        // SAFETY: `helpers` and the table behind its context are boxed and
        // stored on `self` below, so they stay put until the module drops.
        let code = unsafe { (self.init_fn)(&*helpers) };
        self._config = Some(table);
        self._helpers = Some(helpers);
        code
    }

    fn process(&mut self, entry: &LogEntry) -> PluginResult {
        let module = to_c_string(&entry.module);
        let message = to_c_string(&entry.message);
        let lang_key = entry.diagnostic_key.as_deref().map(to_c_string);

        let c_entry = CLogEntry {
            timestamp: c_ulong::try_from(entry.timestamp).unwrap_or(c_ulong::MAX),
            level: entry.level as c_int,
            module: module.as_ptr(),
            message: message.as_ptr(),
            lang_key: lang_key.as_ref().map_or(ptr::null(), |k| k.as_ptr()),
        };

        // SAFETY: every string in `c_entry` outlives the call.
        let code = unsafe { (self.process_fn)(&c_entry) };
        PluginResult::from_code(code)
    }

    fn shutdown(&mut self) {
        // SAFETY: resolved from the loaded image with the documented signature.
        unsafe { (self.shutdown_fn)() }
    }
}

fn copy_info(info: &CPluginInfo, fallback_name: &str) -> PluginDescriptor {
    PluginDescriptor {
        name: copy_str(info.name).unwrap_or_else(|| fallback_name.to_string()),
        version: copy_str(info.version).unwrap_or_else(|| "unknown".to_string()),
        author: copy_str(info.author).unwrap_or_else(|| "unknown".to_string()),
        kind: PluginKind::from_abi(info.kind),
        mode: InvocationMode::from_abi(info.mode),
        capabilities: Capabilities::from_bits_truncate(info.capabilities),
        description: copy_str(info.description).unwrap_or_default(),
    }
}

fn copy_str(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    // SAFETY: non-null strings from the image are NUL-terminated.
    Some(unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned())
}

/// Interior NULs cannot cross the ABI; they are dropped.
fn to_c_string(s: &str) -> CString {
    CString::new(s).unwrap_or_else(|_| {
        let cleaned: Vec<u8> = s.bytes().filter(|b| *b != 0).collect();
        CString::new(cleaned).unwrap_or_default()
    })
}

/// A plugin's configuration section flattened into C-ready values.
#[derive(Debug, Default)]
struct ConfigTable {
    ints: HashMap<String, c_int>,
    bools: HashMap<String, bool>,
    strings: HashMap<String, CString>,
    arrays: HashMap<String, Vec<CString>>,
}

impl ConfigTable {
    fn from_config(config: &PluginConfig) -> Self {
        let mut table = ConfigTable::default();
        let Some(section) = config.section() else {
            return table;
        };

        for (key, value) in section {
            match value {
                Value::Number(_) => {
                    if let Some(v) = int_value(value).and_then(|v| c_int::try_from(v).ok()) {
                        table.ints.insert(key.clone(), v);
                    }
                }
                Value::Bool(b) => {
                    table.bools.insert(key.clone(), *b);
                }
                Value::String(s) => {
                    table.strings.insert(key.clone(), to_c_string(s));
                }
                Value::Array(items) => {
                    let strings = items
                        .iter()
                        .filter_map(Value::as_str)
                        .map(to_c_string)
                        .collect();
                    table.arrays.insert(key.clone(), strings);
                }
                Value::Null | Value::Object(_) => {}
            }
        }
        table
    }
}

fn lookup<'a, T>(
    ctx: *const c_void,
    key: *const c_char,
    find: impl FnOnce(&'a ConfigTable, &str) -> Option<T>,
) -> Option<T> {
    // SAFETY: `ctx` is null or the context installed by `NativeModule::init`,
    // which points into a box owned by the module for its whole lifetime.
    let table = unsafe { ctx.cast::<ConfigTable>().as_ref() }?;
    if key.is_null() {
        return None;
    }
    // SAFETY: keys come from the plugin as NUL-terminated strings.
    let key = unsafe { CStr::from_ptr(key) }.to_str().ok()?;
    find(table, key)
}

extern "C" fn config_int(ctx: *const c_void, key: *const c_char, default: c_int) -> c_int {
    lookup(ctx, key, |t, k| t.ints.get(k).copied()).unwrap_or(default)
}

extern "C" fn config_string(
    ctx: *const c_void,
    key: *const c_char,
    default: *const c_char,
) -> *const c_char {
    lookup(ctx, key, |t, k| t.strings.get(k).map(|s| s.as_ptr())).unwrap_or(default)
}

extern "C" fn config_bool(ctx: *const c_void, key: *const c_char, default: bool) -> bool {
    lookup(ctx, key, |t, k| t.bools.get(k).copied()).unwrap_or(default)
}

extern "C" fn config_array(
    ctx: *const c_void,
    key: *const c_char,
    out: *mut *const c_char,
    max_count: c_int,
) -> c_int {
    if out.is_null() {
        return 0;
    }
    let Some(items) = lookup(ctx, key, |t, k| t.arrays.get(k)) else {
        return 0;
    };
    let limit = usize::try_from(max_count).unwrap_or(0);

    let mut written: c_int = 0;
    for (i, item) in items.iter().take(limit).enumerate() {
        // SAFETY: the caller provides room for `max_count` pointers at `out`
        // and `i < max_count`.
        unsafe { out.add(i).write(item.as_ptr()) };
        written += 1;
    }
    written
}
