use crate::plugin::PluginKind;
use bitflags::bitflags;
use strum_macros::{Display, EnumString};

bitflags! {
    /// Optional features a plugin advertises. Informational only; the
    /// pipeline hands every plugin one entry at a time.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Capabilities: u32 {
        const NONE = 0;
        const BATCH = 1;
        const JSON = 2;
        const STREAM = 4;
    }
}

#[derive(Display, EnumString, Debug, Clone, Copy, Default, Eq, Hash, PartialEq)]
#[strum(serialize_all = "lowercase")]
pub enum InvocationMode {
    #[default]
    Sync,
    Async,
}

impl InvocationMode {
    pub fn from_abi(raw: i32) -> Self {
        if raw == 1 {
            InvocationMode::Async
        } else {
            InvocationMode::Sync
        }
    }
}

/// Self-description of a plugin, copied out of the plugin at load time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PluginDescriptor {
    pub name: String,
    pub version: String,
    pub author: String,
    pub kind: PluginKind,
    pub mode: InvocationMode,
    pub capabilities: Capabilities,
    pub description: String,
}

impl PluginDescriptor {
    pub fn new(name: &str, kind: PluginKind) -> Self {
        PluginDescriptor {
            name: name.to_string(),
            version: "1.0.0".to_string(),
            author: String::new(),
            kind,
            mode: InvocationMode::Sync,
            capabilities: Capabilities::NONE,
            description: String::new(),
        }
    }

    /// Stand-in for plugins that do not describe themselves. An unknown kind
    /// keeps the instance loaded but out of every pass.
    pub fn synthesized(name: &str) -> Self {
        PluginDescriptor {
            version: "unknown".to_string(),
            author: "unknown".to_string(),
            description: "no description".to_string(),
            ..PluginDescriptor::new(name, PluginKind::Unknown)
        }
    }

    pub fn with_version(mut self, version: &str) -> Self {
        self.version = version.to_string();
        self
    }

    pub fn with_author(mut self, author: &str) -> Self {
        self.author = author.to_string();
        self
    }

    pub fn with_mode(mut self, mode: InvocationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }
}
