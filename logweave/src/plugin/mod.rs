mod _enums;
mod _traits;
mod backend;
mod config;
mod descriptor;
#[allow(unsafe_code)]
pub mod native;
mod registry;

// Re-exporting all public structures
pub use _enums::kind::PluginKind;
pub use _enums::result::PluginResult;
pub use _enums::state::PluginState;

pub use _traits::plugin_module::PluginModule;
#[cfg(test)]
pub(crate) use _traits::plugin_module::MockPluginModule;

pub use backend::PluginBackend;
pub use config::{PluginConfig, PluginSettings};
pub use descriptor::{Capabilities, InvocationMode, PluginDescriptor};
pub use native::NativeModule;
pub use registry::{PluginRegistry, PluginSource};
