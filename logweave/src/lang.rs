//! Message catalogs for publishing by key.

use std::collections::HashMap;

pub const DEFAULT_LOCALE: &str = "en";

/// Resolves message keys to display text for one locale.
pub trait Translator: Send + Sync {
    fn lookup(&self, key: &str) -> Option<String>;
    fn locale(&self) -> &str;
}

/// In-memory key to text table.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    locale: String,
    messages: HashMap<String, String>,
}

impl Catalog {
    pub fn new(locale: &str) -> Self {
        Catalog {
            locale: locale.to_string(),
            messages: HashMap::new(),
        }
    }

    pub fn with(mut self, key: &str, text: &str) -> Self {
        self.insert(key, text);
        self
    }

    pub fn insert(&mut self, key: &str, text: &str) {
        self.messages.insert(key.to_string(), text.to_string());
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl Translator for Catalog {
    fn lookup(&self, key: &str) -> Option<String> {
        self.messages.get(key).cloned()
    }

    fn locale(&self) -> &str {
        &self.locale
    }
}
