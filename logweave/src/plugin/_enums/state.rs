use strum_macros::Display;

/// Lifecycle of a loaded plugin instance.
///
/// `Resolved` entry points are initialized once; a successful init leaves the
/// instance `Active` or, when the allow/deny lists exclude it, `Disabled`.
/// Only `Active` instances receive entries or a shutdown call.
#[derive(Display, Debug, Clone, Copy, Eq, Hash, PartialEq)]
#[strum(serialize_all = "kebab_case")]
pub enum PluginState {
    Resolved,
    Initialized,
    Active,
    Disabled,
    ShuttingDown,
    Unloaded,
}

impl PluginState {
    /// Whether the runtime enable switch can move this instance.
    pub fn is_toggleable(self) -> bool {
        matches!(self, PluginState::Active | PluginState::Disabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_display() {
        assert_eq!(PluginState::Active.to_string(), "active");
        assert_eq!(PluginState::ShuttingDown.to_string(), "shutting-down");
    }

    #[test]
    fn test_toggleable_states() {
        assert!(PluginState::Active.is_toggleable());
        assert!(PluginState::Disabled.is_toggleable());
        assert!(!PluginState::Resolved.is_toggleable());
        assert!(!PluginState::Unloaded.is_toggleable());
    }
}
