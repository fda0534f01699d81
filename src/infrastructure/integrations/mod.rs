//! Output integration lifecycle
//!
//! Integrations move through a fixed state machine:
//! `unselected -> selected -> started -> stopped-or-selected`. The selected
//! set is chosen at most once per process; start/stop may cycle after that.
//! Out-of-order calls are hard errors, everything a plugin does wrong is
//! isolated and logged.

pub mod adapter;
pub mod console;
pub mod loader;

pub use adapter::BridgedIntegration;
pub use console::{ConsoleIntegration, CONSOLE_INTEGRATION};
pub use loader::{IntegrationLoader, NativeIntegrationLoader};

use crate::application::errors::{IntegrationError, UnitError};
use crate::domain::entities::{normalize_name, platform as current_platform};
use crate::domain::entities::{IntegrationDescriptor, Platform};
use crate::domain::traits::{EventSink, Integration, LoadedEntry, Scanner};
use crate::infrastructure::modules::manifest::UnitManifest;
use crate::infrastructure::scanner::FsScanner;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

/// Primary manifest file name inside an integration directory.
pub const INTEGRATION_MANIFEST: &str = "hearth.json";

/// Config key for the command prefix an integration answers to.
pub const COMMAND_PREFIX_KEY: &str = "command-prefix";

/// Config keys with this prefix (and an all-uppercase name) are copied into
/// the process environment during `configure`.
const ENV_PREFIX: &str = "ENV_";

/// One selected integration and its live instance handle. The handle is
/// released on stop.
pub struct SelectedIntegration {
    pub descriptor: IntegrationDescriptor,
    instance: RwLock<Option<Arc<dyn Integration>>>,
}

impl SelectedIntegration {
    pub fn instance(&self) -> Option<Arc<dyn Integration>> {
        self.instance
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

pub struct IntegrationManager {
    loader: Arc<dyn IntegrationLoader>,
    scanner: Arc<dyn Scanner>,
    integrations_dir: PathBuf,
    builtin_dir: PathBuf,
    cached: RwLock<Option<Vec<IntegrationDescriptor>>>,
    selected: RwLock<Option<Vec<Arc<SelectedIntegration>>>>,
    started: AtomicBool,
}

impl IntegrationManager {
    pub fn new(
        integrations_dir: impl Into<PathBuf>,
        builtin_dir: impl Into<PathBuf>,
    ) -> Self {
        Self::with_parts(
            Arc::new(NativeIntegrationLoader::new()),
            Arc::new(FsScanner),
            integrations_dir,
            builtin_dir,
        )
    }

    pub fn with_parts(
        loader: Arc<dyn IntegrationLoader>,
        scanner: Arc<dyn Scanner>,
        integrations_dir: impl Into<PathBuf>,
        builtin_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            loader,
            scanner,
            integrations_dir: integrations_dir.into(),
            builtin_dir: builtin_dir.into(),
            cached: RwLock::new(None),
            selected: RwLock::new(None),
            started: AtomicBool::new(false),
        }
    }

    /// Enumerate integration candidates, the reserved built-in first. The
    /// result is memoized for the process lifetime.
    pub fn list(&self) -> Vec<IntegrationDescriptor> {
        if let Some(cached) = self
            .cached
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
        {
            return cached;
        }

        let mut candidates = vec![self.builtin_dir.join(CONSOLE_INTEGRATION)];
        match self.scanner.entries(&self.integrations_dir) {
            Ok(names) => {
                candidates.extend(names.into_iter().map(|n| self.integrations_dir.join(n)));
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to scan integrations directory {}: {}",
                    self.integrations_dir.display(),
                    e
                );
            }
        }

        let mut list = Vec::new();
        for (index, path) in candidates.iter().enumerate() {
            match describe(path) {
                Ok(descriptor) => list.push(descriptor),
                // The built-in console integration is compiled into the
                // host; it stays listed even without an on-disk manifest.
                Err(_) if index == 0 => list.push(IntegrationDescriptor {
                    name: CONSOLE_INTEGRATION.to_string(),
                    startup: String::new(),
                    folder_path: path.clone(),
                }),
                Err(e) => {
                    tracing::error!("Invalid integration at {}: {}", path.display(), e);
                }
            }
        }

        *self.cached.write().unwrap_or_else(|e| e.into_inner()) = Some(list.clone());
        list
    }

    /// Choose the integration set for this process. All-or-nothing: if any
    /// entry point fails to load, the selection stays unset.
    pub fn select(
        &self,
        descriptors: Vec<IntegrationDescriptor>,
    ) -> Result<(), IntegrationError> {
        let mut selected = self.selected.write().unwrap_or_else(|e| e.into_inner());
        if selected.is_some() {
            return Err(IntegrationError::State(
                "Cannot change integrations when they are already set".to_string(),
            ));
        }

        let mut loaded = Vec::with_capacity(descriptors.len());
        for descriptor in descriptors {
            let instance: Arc<dyn Integration> = match self.loader.load(&descriptor)? {
                LoadedEntry::Integration(integration) => integration,
                LoadedEntry::Bridge(bridge) => Arc::new(BridgedIntegration::new(bridge)),
            };
            loaded.push(Arc::new(SelectedIntegration {
                descriptor,
                instance: RwLock::new(Some(instance)),
            }));
        }

        *selected = Some(loaded);
        Ok(())
    }

    /// Bind the platform to every selected integration, materialize
    /// `ENV_*` config keys into the process environment and default the
    /// command prefix.
    pub fn configure(&self, platform: Arc<Platform>) -> Result<(), IntegrationError> {
        let selected = self.selected()?;
        current_platform::set_current(Some(platform.clone()));

        for integration in &selected {
            let Some(instance) = integration.instance() else {
                continue;
            };
            instance.set_platform(platform.clone());

            let section = platform
                .config
                .get_system_config(&integration.descriptor.name);
            {
                let mut config = section.write().unwrap_or_else(|e| e.into_inner());
                for (key, value) in config.iter() {
                    if let Some(name) = key.strip_prefix(ENV_PREFIX) {
                        if key == &key.to_uppercase() {
                            let value = match value {
                                Value::String(s) => s.clone(),
                                other => other.to_string(),
                            };
                            std::env::set_var(name, value);
                        }
                    }
                }
                if !config.contains_key(COMMAND_PREFIX_KEY) {
                    config.insert(
                        COMMAND_PREFIX_KEY.to_string(),
                        Value::String(platform.default_prefix.clone()),
                    );
                }
            }
            instance.set_config(section);
        }
        Ok(())
    }

    /// Start every selected integration. Starts are scheduled
    /// independently with no ordering guarantee; a failing start is logged
    /// and never aborts a sibling or the call. The started flag is set once
    /// everything has been scheduled, not once it has completed.
    pub fn start(&self, sink: EventSink) -> Result<(), IntegrationError> {
        let selected = self.selected().map_err(|_| {
            IntegrationError::State("Integrations must be set before starting".to_string())
        })?;
        // An empty selection counts as never having been set.
        if selected.is_empty() {
            return Err(IntegrationError::State(
                "Integrations must be set before starting".to_string(),
            ));
        }
        if self.started.load(Ordering::SeqCst) {
            return Err(IntegrationError::State(
                "Integrations are already started".to_string(),
            ));
        }

        for integration in selected {
            let name = integration.descriptor.name.clone();
            let Some(instance) = integration.instance() else {
                continue;
            };
            let tagged = sink.tagged(&name);
            tokio::spawn(async move {
                tracing::info!("Starting integration '{}'", name);
                if let Err(e) = instance.start(tagged).await {
                    tracing::error!("Failed to start integration '{}': {}", name, e);
                }
            });
        }

        self.started.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Stop every selected integration in sequence and release the
    /// instance handles. Per-item failures are logged; the shared current
    /// platform handle is cleared unconditionally at the end.
    pub async fn stop(&self) -> Result<(), IntegrationError> {
        if !self.started.load(Ordering::SeqCst) {
            return Err(IntegrationError::State(
                "Cannot stop integrations if they haven't been started".to_string(),
            ));
        }

        for integration in self.selected()? {
            let name = integration.descriptor.name.clone();
            let instance = integration
                .instance
                .write()
                .unwrap_or_else(|e| e.into_inner())
                .take();
            if let Some(instance) = instance {
                tracing::info!("Stopping integration '{}'", name);
                if let Err(e) = instance.stop().await {
                    tracing::error!("Failed to stop integration '{}': {}", name, e);
                }
            }
        }

        self.started.store(false, Ordering::SeqCst);
        current_platform::set_current(None);
        Ok(())
    }

    /// Name to instance mapping of the selected set. Instances released by
    /// `stop` are absent.
    pub fn get_active(
        &self,
    ) -> Result<HashMap<String, Arc<dyn Integration>>, IntegrationError> {
        let selected = self.selected().map_err(|_| {
            IntegrationError::State(
                "Cannot get integrations if they have not already been set".to_string(),
            )
        })?;
        let mut active = HashMap::new();
        for integration in selected {
            if let Some(instance) = integration.instance() {
                active.insert(integration.descriptor.name.clone(), instance);
            }
        }
        Ok(active)
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    fn selected(&self) -> Result<Vec<Arc<SelectedIntegration>>, IntegrationError> {
        self.selected
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .ok_or_else(|| {
                IntegrationError::State("Integrations have not been set".to_string())
            })
    }
}

/// Build a descriptor for an integration directory: primary manifest,
/// falling back to secondary-manifest derivation.
fn describe(path: &Path) -> Result<IntegrationDescriptor, UnitError> {
    if !path.is_dir() {
        return Err(UnitError::Manifest(format!(
            "Integration must be a directory: {}",
            path.display()
        )));
    }

    let manifest = UnitManifest::from_file(&path.join(INTEGRATION_MANIFEST))
        .or_else(|_| UnitManifest::from_package(path))?;

    let name = normalize_name(&manifest.name);
    if name.is_empty() || manifest.startup.is_empty() {
        return Err(UnitError::Manifest(format!(
            "Not enough information provided to describe integration at {}",
            path.display()
        )));
    }

    Ok(IntegrationDescriptor {
        name,
        startup: manifest.startup,
        folder_path: path.to_path_buf(),
    })
}
