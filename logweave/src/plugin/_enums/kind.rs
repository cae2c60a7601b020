use std::os::raw::c_int;
use strum_macros::{Display, EnumString, VariantNames};

/// The stage of the pipeline a plugin takes part in.
#[derive(EnumString, VariantNames, Display, Debug, Clone, Copy, Eq, Hash, PartialEq)]
#[strum(serialize_all = "kebab_case")]
pub enum PluginKind {
    Filter,
    Sink,
    Analysis,
    LanguageResource,
    Unknown,
}

impl PluginKind {
    /// Map the numeric kind reported by a native image. Out-of-range values
    /// are `Unknown`, which no pass ever dispatches to.
    pub fn from_abi(raw: c_int) -> Self {
        match raw {
            0 => PluginKind::Filter,
            1 => PluginKind::Sink,
            2 => PluginKind::Analysis,
            3 => PluginKind::LanguageResource,
            _ => PluginKind::Unknown,
        }
    }
}
