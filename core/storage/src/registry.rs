//! Store registry for resolving a backend by name.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::local::LocalStore;
use crate::memory::MemoryStore;
use crate::store::VaultStore;
use keyward_common::{Error, Result};

/// Factory function type for creating stores.
pub type StoreFactory = Box<dyn Fn(Value) -> Result<Arc<dyn VaultStore>> + Send + Sync>;

/// Registry for store factories.
///
/// Allows registration and resolution of backends by name and
/// configuration.
pub struct StoreRegistry {
    factories: HashMap<String, StoreFactory>,
}

impl StoreRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a store factory.
    ///
    /// # Errors
    /// - Returns error if name is already registered
    pub fn register(&mut self, name: impl Into<String>, factory: StoreFactory) -> Result<()> {
        let name = name.into();
        if self.factories.contains_key(&name) {
            return Err(Error::InvalidInput(format!(
                "Store '{}' is already registered",
                name
            )));
        }
        self.factories.insert(name, factory);
        Ok(())
    }

    /// Resolve a store by name and configuration.
    ///
    /// # Errors
    /// - Store not found
    /// - Configuration invalid
    pub fn resolve(&self, name: &str, config: Value) -> Result<Arc<dyn VaultStore>> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| Error::NotFound(format!("Store '{}' is not registered", name)))?;
        factory(config)
    }

    /// Get list of registered store names.
    pub fn stores(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for StoreRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Create a registry with the built-in stores.
///
/// - `"memory"`: no configuration
/// - `"local"`: `{ "path": "<file>" }`
pub fn create_default_registry() -> StoreRegistry {
    let mut registry = StoreRegistry::new();

    registry.factories.insert(
        "memory".to_string(),
        Box::new(|_config| Ok(Arc::new(MemoryStore::new()) as Arc<dyn VaultStore>)),
    );

    registry.factories.insert(
        "local".to_string(),
        Box::new(|config| {
            let path = config
                .get("path")
                .and_then(|v| v.as_str())
                .ok_or_else(|| Error::InvalidInput("Missing 'path' in config".to_string()))?;
            Ok(Arc::new(LocalStore::new(path)?) as Arc<dyn VaultStore>)
        }),
    );

    registry
}
