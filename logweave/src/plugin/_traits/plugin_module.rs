use crate::event::LogEntry;
use crate::plugin::{PluginConfig, PluginDescriptor, PluginResult};

/// The narrow interface the registry drives every plugin through.
///
/// Native images are wrapped by [`NativeModule`](crate::plugin::NativeModule);
/// statically linked plugins implement this trait directly and are handed to
/// [`PluginRegistry::register`](crate::plugin::PluginRegistry::register).
/// Calls are serialized by the registry, so implementations need `Send` but
/// not `Sync`.
#[cfg_attr(test, mockall::automock)]
pub trait PluginModule: Send {
    /// Self-description, or `None` to have one synthesized from the name.
    fn descriptor(&self) -> Option<PluginDescriptor>;

    /// Called once at load. Zero is success; anything else leaves the
    /// plugin loaded but disabled.
    fn init(&mut self, config: &PluginConfig) -> i32;

    fn process(&mut self, entry: &LogEntry) -> PluginResult;

    /// Called once at unload, and only if the plugin was enabled.
    fn shutdown(&mut self);
}
