//! Integration entry-point loading

use crate::application::errors::IntegrationError;
use crate::domain::entities::IntegrationDescriptor;
use crate::domain::traits::{
    BridgeInitFn, ChatBridge, Integration, IntegrationInitFn, LoadedEntry,
};
use crate::infrastructure::integrations::console::{ConsoleIntegration, CONSOLE_INTEGRATION};
use libloading::{Library, Symbol};
use std::sync::{Arc, Mutex};

/// Loader seam for integration entry points.
pub trait IntegrationLoader: Send + Sync {
    fn load(&self, descriptor: &IntegrationDescriptor) -> Result<LoadedEntry, IntegrationError>;
}

/// Loads integrations from native dylibs. An entry point exporting
/// `hearth_bridge_init` is treated as a bare chat bridge; otherwise
/// `hearth_integration_init` must be present.
#[derive(Default)]
pub struct NativeIntegrationLoader {
    // Selection happens once per process, so loaded libraries are simply
    // retained for the process lifetime.
    libraries: Mutex<Vec<Library>>,
}

impl NativeIntegrationLoader {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IntegrationLoader for NativeIntegrationLoader {
    fn load(&self, descriptor: &IntegrationDescriptor) -> Result<LoadedEntry, IntegrationError> {
        // The reserved built-in is compiled into the host.
        if descriptor.name == CONSOLE_INTEGRATION {
            return Ok(LoadedEntry::Integration(Arc::new(ConsoleIntegration::new())));
        }

        let library_path = descriptor.folder_path.join(&descriptor.startup);
        let library = unsafe {
            Library::new(&library_path)
                .map_err(|e| IntegrationError::Load(format!("Failed to load library: {}", e)))?
        };

        let entry = unsafe {
            if let Ok(init_fn) = library.get::<BridgeInitFn>(b"hearth_bridge_init") {
                let bridge_ptr = init_fn();
                if bridge_ptr.is_null() {
                    return Err(IntegrationError::Load(
                        "Bridge init returned null".to_string(),
                    ));
                }
                let bridge: Arc<dyn ChatBridge> = Arc::from(Box::from_raw(bridge_ptr));
                LoadedEntry::Bridge(bridge)
            } else {
                let init_fn: Symbol<IntegrationInitFn> =
                    library.get(b"hearth_integration_init").map_err(|e| {
                        IntegrationError::Load(format!("Failed to find init symbol: {}", e))
                    })?;
                let ptr = init_fn();
                if ptr.is_null() {
                    return Err(IntegrationError::Load(
                        "Integration init returned null".to_string(),
                    ));
                }
                let integration: Arc<dyn Integration> = Arc::from(Box::from_raw(ptr));
                LoadedEntry::Integration(integration)
            }
        };

        self.libraries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(library);
        Ok(entry)
    }
}
