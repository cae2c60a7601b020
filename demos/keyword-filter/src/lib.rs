//! Native filter plugin that vetoes entries containing any configured keyword.
//!
//! Configuration (`plugins.config.keyword_filter`):
//! - `keywords`: up to 20 strings, default `["ERROR"]`
//! - `case_sensitive`: default `false`

use logweave::plugin::native::abi::{
    CLogEntry, CPluginInfo, PluginHelpers, KIND_FILTER, MODE_SYNC, RESULT_OK, RESULT_SKIP,
};
use std::ffi::CStr;
use std::os::raw::{c_char, c_int};
use std::ptr;
use std::sync::{Mutex, PoisonError};

const MAX_KEYWORDS: usize = 20;
const DEFAULT_KEYWORD: &str = "ERROR";

struct FilterState {
    keywords: Vec<String>,
    case_sensitive: bool,
}

impl FilterState {
    const fn new() -> Self {
        FilterState {
            keywords: Vec::new(),
            case_sensitive: false,
        }
    }

    fn configure(&mut self, keywords: Vec<String>, case_sensitive: bool) {
        self.case_sensitive = case_sensitive;
        self.keywords = if keywords.is_empty() {
            vec![DEFAULT_KEYWORD.to_string()]
        } else {
            keywords
        };
        if !case_sensitive {
            for keyword in &mut self.keywords {
                *keyword = keyword.to_lowercase();
            }
        }
    }

    fn matches(&self, message: &str) -> bool {
        if self.case_sensitive {
            self.keywords.iter().any(|k| message.contains(k.as_str()))
        } else {
            let message = message.to_lowercase();
            self.keywords.iter().any(|k| message.contains(k.as_str()))
        }
    }
}

static STATE: Mutex<FilterState> = Mutex::new(FilterState::new());

struct StaticInfo(CPluginInfo);

// SAFETY: every pointer in the descriptor refers to a 'static C string literal.
unsafe impl Sync for StaticInfo {}

static INFO: StaticInfo = StaticInfo(CPluginInfo {
    name: c"keyword_filter".as_ptr(),
    version: c"1.0.0".as_ptr(),
    author: c"logweave".as_ptr(),
    kind: KIND_FILTER,
    mode: MODE_SYNC,
    capabilities: 0,
    description: c"Drops entries whose message contains a configured keyword".as_ptr(),
});

fn read_keywords(helpers: &PluginHelpers) -> Vec<String> {
    let mut raw = [ptr::null::<c_char>(); MAX_KEYWORDS];
    let count = (helpers.get_config_array)(
        helpers.context,
        c"keywords".as_ptr(),
        raw.as_mut_ptr(),
        MAX_KEYWORDS as c_int,
    );
    let count = usize::try_from(count).unwrap_or(0).min(MAX_KEYWORDS);

    raw.iter()
        .take(count)
        .filter(|p| !p.is_null())
        // SAFETY: the host fills the array with NUL-terminated strings that
        // stay valid until unload; nulls were filtered above.
        .map(|p| unsafe { CStr::from_ptr(*p) }.to_string_lossy().into_owned())
        .filter(|k| !k.is_empty())
        .collect()
}

/// # Safety
///
/// `helpers` must be null or point to a valid `PluginHelpers`.
#[no_mangle]
pub unsafe extern "C" fn plugin_init(helpers: *const PluginHelpers) -> c_int {
    // SAFETY: guaranteed by the caller.
    let (keywords, case_sensitive) = match unsafe { helpers.as_ref() } {
        Some(h) => (
            read_keywords(h),
            (h.get_config_bool)(h.context, c"case_sensitive".as_ptr(), false),
        ),
        None => (Vec::new(), false),
    };

    STATE
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .configure(keywords, case_sensitive);
    0
}

/// # Safety
///
/// `entry` must be null or point to a valid `CLogEntry` whose strings are
/// NUL-terminated.
#[no_mangle]
pub unsafe extern "C" fn plugin_process(entry: *const CLogEntry) -> c_int {
    // SAFETY: guaranteed by the caller.
    let Some(entry) = (unsafe { entry.as_ref() }) else {
        return RESULT_OK;
    };
    if entry.message.is_null() {
        return RESULT_OK;
    }
    // SAFETY: checked for null above; NUL-terminated per the caller contract.
    let message = unsafe { CStr::from_ptr(entry.message) }.to_string_lossy();

    if STATE
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .matches(&message)
    {
        RESULT_SKIP
    } else {
        RESULT_OK
    }
}

#[no_mangle]
pub extern "C" fn plugin_shutdown() {
    let mut state = STATE.lock().unwrap_or_else(PoisonError::into_inner);
    state.keywords.clear();
}

#[no_mangle]
pub extern "C" fn plugin_info() -> *const CPluginInfo {
    &INFO.0
}
