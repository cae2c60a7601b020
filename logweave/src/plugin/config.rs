use serde_json::{Map, Value};
use std::path::PathBuf;

/// Integer reading of a JSON number, truncating fractions. Numbers outside
/// the `i64` range have no integer reading.
pub(crate) fn int_value(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| (i64::MIN as f64..i64::MAX as f64).contains(f))
            .map(|f| f.trunc() as i64)
    })
}

/// One plugin's section of the `plugins.config` map.
///
/// Every accessor falls back to the caller's default when the section is
/// missing or the value has the wrong type.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PluginConfig {
    section: Option<Map<String, Value>>,
}

impl PluginConfig {
    pub fn new(section: Option<Map<String, Value>>) -> Self {
        PluginConfig { section }
    }

    /// A config with no section; every lookup yields the default.
    pub fn empty() -> Self {
        PluginConfig::default()
    }

    fn value(&self, key: &str) -> Option<&Value> {
        self.section.as_ref().and_then(|s| s.get(key))
    }

    pub fn has_section(&self) -> bool {
        self.section.is_some()
    }

    /// Integer value of `key`. Fractional numbers are truncated toward zero.
    pub fn get_int(&self, key: &str, default: i64) -> i64 {
        self.value(key).and_then(int_value).unwrap_or(default)
    }

    pub fn get_string(&self, key: &str, default: &str) -> String {
        self.value(key)
            .and_then(Value::as_str)
            .unwrap_or(default)
            .to_string()
    }

    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        self.value(key).and_then(Value::as_bool).unwrap_or(default)
    }

    /// String items of an array value; other items are skipped.
    pub fn get_string_array(&self, key: &str) -> Vec<String> {
        self.value(key)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub(crate) fn section(&self) -> Option<&Map<String, Value>> {
        self.section.as_ref()
    }
}

/// Everything the registry needs to decide what to load and how.
#[derive(Clone, Debug, Default)]
pub struct PluginSettings {
    pub search_paths: Vec<PathBuf>,
    pub enabled: Vec<String>,
    pub disabled: Vec<String>,
    pub order: Vec<String>,
    pub configs: Map<String, Value>,
}

impl PluginSettings {
    pub fn new() -> Self {
        PluginSettings::default()
    }

    pub fn with_search_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.search_paths.push(path.into());
        self
    }

    pub fn with_enabled(mut self, names: &[&str]) -> Self {
        self.enabled = names.iter().map(|n| n.to_string()).collect();
        self
    }

    pub fn with_disabled(mut self, names: &[&str]) -> Self {
        self.disabled = names.iter().map(|n| n.to_string()).collect();
        self
    }

    pub fn with_order(mut self, names: &[&str]) -> Self {
        self.order = names.iter().map(|n| n.to_string()).collect();
        self
    }

    pub fn with_config(mut self, name: &str, section: Value) -> Self {
        self.configs.insert(name.to_string(), section);
        self
    }

    /// Deny list wins; an empty allow list admits everything else.
    pub fn is_allowed(&self, name: &str) -> bool {
        if self.disabled.iter().any(|n| n == name) {
            return false;
        }
        self.enabled.is_empty() || self.enabled.iter().any(|n| n == name)
    }

    /// Position in the order list; unlisted plugins sort last.
    pub fn priority(&self, name: &str) -> i64 {
        self.order
            .iter()
            .position(|n| n == name)
            .and_then(|p| i64::try_from(p).ok())
            .unwrap_or(i64::MAX)
    }

    pub fn config_for(&self, name: &str) -> PluginConfig {
        PluginConfig::new(self.configs.get(name).and_then(Value::as_object).cloned())
    }
}
