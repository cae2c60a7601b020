use std::os::raw::c_int;

/// What a plugin reports back for a single entry.
///
/// For filters anything but `Ok` vetoes the entry. Sinks and analysers
/// report status only; it never changes what other plugins see.
#[derive(Debug, Clone, Copy, Eq, Hash, PartialEq)]
pub enum PluginResult {
    Ok,
    Error,
    Skip,
    Retry,
}

impl PluginResult {
    /// Decode a native return code. Unrecognised codes are treated as errors.
    pub fn from_code(code: c_int) -> Self {
        match code {
            0 => PluginResult::Ok,
            2 => PluginResult::Skip,
            3 => PluginResult::Retry,
            _ => PluginResult::Error,
        }
    }

    pub fn code(self) -> c_int {
        match self {
            PluginResult::Ok => 0,
            PluginResult::Error => 1,
            PluginResult::Skip => 2,
            PluginResult::Retry => 3,
        }
    }

    pub fn is_ok(self) -> bool {
        self == PluginResult::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes() {
        assert_eq!(PluginResult::from_code(0), PluginResult::Ok);
        assert_eq!(PluginResult::from_code(1), PluginResult::Error);
        assert_eq!(PluginResult::from_code(2), PluginResult::Skip);
        assert_eq!(PluginResult::from_code(3), PluginResult::Retry);
    }

    #[test]
    fn test_unknown_code_is_error() {
        assert_eq!(PluginResult::from_code(42), PluginResult::Error);
        assert_eq!(PluginResult::from_code(-1), PluginResult::Error);
    }

    #[test]
    fn test_code_matches_decoding() {
        for result in [
            PluginResult::Ok,
            PluginResult::Error,
            PluginResult::Skip,
            PluginResult::Retry,
        ] {
            assert_eq!(PluginResult::from_code(result.code()), result);
        }
    }

    #[test]
    fn test_only_ok_passes() {
        assert!(PluginResult::Ok.is_ok());
        assert!(!PluginResult::Skip.is_ok());
        assert!(!PluginResult::Retry.is_ok());
    }
}
