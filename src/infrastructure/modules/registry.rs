//! Unit registry - priority-ordered container of loaded units

use crate::application::errors::LifecycleError;
use crate::domain::entities::{Platform, UnitDescriptor};
use crate::domain::traits::Unit;
use libloading::Library;
use std::sync::{Arc, RwLock};

/// A unit instance together with its descriptor and hosting context.
pub struct LoadedUnit {
    descriptor: UnitDescriptor,
    pub instance: Arc<dyn Unit>,
    platform: RwLock<Option<Arc<Platform>>>,
    // Keeps the backing dylib mapped for as long as the instance lives.
    #[allow(dead_code)]
    library: Option<Library>,
}

impl LoadedUnit {
    pub fn new(
        descriptor: UnitDescriptor,
        instance: Arc<dyn Unit>,
        library: Option<Library>,
        platform: Arc<Platform>,
    ) -> Self {
        Self {
            descriptor,
            instance,
            platform: RwLock::new(Some(platform)),
            library,
        }
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn version(&self) -> &str {
        &self.descriptor.version
    }

    pub fn priority(&self) -> i64 {
        self.descriptor.priority
    }

    pub fn descriptor(&self) -> &UnitDescriptor {
        &self.descriptor
    }

    pub fn platform(&self) -> Option<Arc<Platform>> {
        self.platform
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Drop the back-reference to the hosting platform. Called on unload.
    pub fn clear_platform(&self) {
        *self.platform.write().unwrap_or_else(|e| e.into_inner()) = None;
    }
}

/// Ordered registry of loaded units. The sequence is non-decreasing by
/// resolved priority at all times; only the load and unload orchestrators
/// mutate it.
#[derive(Default)]
pub struct UnitRegistry {
    units: RwLock<Vec<Arc<LoadedUnit>>>,
}

impl UnitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a unit at its priority position. Equal priorities keep
    /// insertion order. Names must be unique among loaded units.
    pub fn insert(&self, unit: Arc<LoadedUnit>) -> Result<(), LifecycleError> {
        let mut units = self
            .units
            .write()
            .map_err(|_| LifecycleError::Internal("Lock poisoned".to_string()))?;

        if units.iter().any(|u| u.name() == unit.name()) {
            return Err(LifecycleError::DuplicateName(unit.name().to_string()));
        }

        let at = units.partition_point(|u| u.priority() <= unit.priority());
        units.insert(at, unit);
        Ok(())
    }

    /// Remove a unit by name.
    pub fn remove(&self, name: &str) -> Result<Arc<LoadedUnit>, LifecycleError> {
        let mut units = self
            .units
            .write()
            .map_err(|_| LifecycleError::Internal("Lock poisoned".to_string()))?;

        match units.iter().position(|u| u.name() == name) {
            Some(index) => Ok(units.remove(index)),
            None => Err(LifecycleError::NotLoaded(name.to_string())),
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<LoadedUnit>> {
        self.units
            .read()
            .ok()?
            .iter()
            .find(|u| u.name() == name)
            .cloned()
    }

    /// The current contents, in priority order.
    pub fn snapshot(&self) -> Vec<Arc<LoadedUnit>> {
        self.units
            .read()
            .map(|u| u.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.units.read().map(|u| u.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
