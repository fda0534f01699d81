//! Collaborator traits: configuration store and directory scanner

use crate::application::errors::ConfigError;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::io;
use std::path::Path;
use std::sync::{Arc, RwLock};

/// A live, shared configuration section. Mutations made by the host (prefix
/// defaults, environment materialization) are visible to the integration
/// holding the same handle.
pub type ConfigSection = Arc<RwLock<Map<String, Value>>>;

/// Configuration collaborator. Persistence itself lives outside this crate;
/// the lifecycle managers only need these three operations.
pub trait ConfigStore: Send + Sync {
    /// Fetch a named system section, creating an empty one if absent.
    fn get_system_config(&self, section: &str) -> ConfigSection;

    /// Load the configuration object for a unit rooted at `folder`.
    fn load_config(&self, folder: &Path, name: &str) -> Result<Value, ConfigError>;

    /// Persist the named unit's configuration.
    fn save_config(&self, name: &str) -> Result<(), ConfigError>;
}

/// Directory scanner collaborator: ordered entry names under a root.
pub trait Scanner: Send + Sync {
    fn entries(&self, root: &Path) -> io::Result<Vec<String>>;
}

/// In-memory config store. Serves the host until a persistent store is
/// wired in, and doubles as the test double.
#[derive(Default)]
pub struct MemoryConfigStore {
    sections: RwLock<HashMap<String, ConfigSection>>,
    saved: RwLock<Vec<String>>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names passed to `save_config`, in call order.
    pub fn saved(&self) -> Vec<String> {
        self.saved
            .read()
            .map(|s| s.clone())
            .unwrap_or_default()
    }
}

impl ConfigStore for MemoryConfigStore {
    fn get_system_config(&self, section: &str) -> ConfigSection {
        let mut sections = self
            .sections
            .write()
            .unwrap_or_else(|e| e.into_inner());
        sections
            .entry(section.to_string())
            .or_insert_with(|| Arc::new(RwLock::new(Map::new())))
            .clone()
    }

    fn load_config(&self, _folder: &Path, _name: &str) -> Result<Value, ConfigError> {
        Ok(Value::Object(Map::new()))
    }

    fn save_config(&self, name: &str) -> Result<(), ConfigError> {
        self.saved
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(name.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_sections_are_created_on_demand_and_shared() {
        let store = MemoryConfigStore::new();
        let a = store.get_system_config("telegram");
        a.write().unwrap().insert("token".into(), "abc".into());

        let b = store.get_system_config("telegram");
        assert_eq!(b.read().unwrap().get("token"), Some(&"abc".into()));
    }

    #[test]
    fn save_config_records_names_in_order() {
        let store = MemoryConfigStore::new();
        store.save_config("joke").unwrap();
        store.save_config("weather").unwrap();
        assert_eq!(store.saved(), vec!["joke", "weather"]);
    }
}
