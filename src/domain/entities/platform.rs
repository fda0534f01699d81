//! Platform context threaded through the lifecycle managers

use crate::domain::traits::ConfigStore;
use once_cell::sync::Lazy;
use std::sync::{Arc, Mutex};

/// Host context handed to units and integrations: identity, default command
/// prefix and the configuration collaborator.
pub struct Platform {
    pub name: String,
    pub default_prefix: String,
    pub config: Arc<dyn ConfigStore>,
}

impl Platform {
    pub fn new(
        name: impl Into<String>,
        default_prefix: impl Into<String>,
        config: Arc<dyn ConfigStore>,
    ) -> Self {
        Self {
            name: name.into(),
            default_prefix: default_prefix.into(),
            config,
        }
    }
}

// Process-wide handle to the platform currently driving the integrations.
// Set by IntegrationManager::configure, cleared by IntegrationManager::stop.
static CURRENT: Lazy<Mutex<Option<Arc<Platform>>>> = Lazy::new(|| Mutex::new(None));

pub fn set_current(platform: Option<Arc<Platform>>) {
    *CURRENT.lock().unwrap_or_else(|e| e.into_inner()) = platform;
}

pub fn current() -> Option<Arc<Platform>> {
    CURRENT.lock().unwrap_or_else(|e| e.into_inner()).clone()
}
