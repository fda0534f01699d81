//! Verifier chain
//!
//! Candidate directories are recognized by an ordered chain of verifier
//! strategies. The first strategy that claims the candidate and produces a
//! usable descriptor wins; its index is recorded on the descriptor so the
//! same strategy later performs the load. Recognition never fails outward:
//! strategy errors are logged and treated as non-recognition.

use crate::application::errors::UnitError;
use crate::domain::entities::{normalize_name, resolve_priority, Platform, UnitDescriptor};
use crate::domain::traits::{Unit, UnitInitFn};
use crate::infrastructure::modules::manifest::UnitManifest;
use async_trait::async_trait;
use libloading::{Library, Symbol};
use std::path::Path;
use std::sync::Arc;

/// A loaded unit instance together with the library that must stay alive
/// for as long as the instance does.
pub struct UnitInstance {
    pub unit: Arc<dyn Unit>,
    pub library: Option<Library>,
}

/// One recognizer strategy. `recognize` classifies a raw candidate path;
/// `load` instantiates a descriptor this strategy previously recognized.
#[async_trait]
pub trait Verifier: Send + Sync {
    fn kind(&self) -> &str;

    fn recognize(&self, path: &Path) -> Result<Option<UnitManifest>, UnitError>;

    async fn load(
        &self,
        descriptor: &UnitDescriptor,
        platform: Arc<Platform>,
    ) -> Result<UnitInstance, UnitError>;
}

/// Ordered set of verifier strategies.
pub struct VerifierChain {
    verifiers: Vec<Arc<dyn Verifier>>,
}

impl VerifierChain {
    pub fn new(verifiers: Vec<Arc<dyn Verifier>>) -> Self {
        Self { verifiers }
    }

    /// The production chain: the current manifest convention first, then the
    /// pre-1.0 convention for units that have not been repackaged.
    pub fn native() -> Self {
        Self::new(vec![
            Arc::new(DylibVerifier::hearth()),
            Arc::new(DylibVerifier::classic()),
        ])
    }

    pub fn get(&self, index: usize) -> Option<&Arc<dyn Verifier>> {
        self.verifiers.get(index)
    }

    pub fn len(&self) -> usize {
        self.verifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.verifiers.is_empty()
    }

    /// Classify a candidate. Returns the winning descriptor, or `None` when
    /// no strategy recognizes the path.
    pub fn recognize(&self, path: &Path) -> Option<UnitDescriptor> {
        for (index, verifier) in self.verifiers.iter().enumerate() {
            let manifest = match verifier.recognize(path) {
                Ok(Some(manifest)) => manifest,
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!(
                        "Verifier '{}' failed on {}: {}",
                        verifier.kind(),
                        path.display(),
                        e
                    );
                    continue;
                }
            };

            let name = normalize_name(&manifest.name);
            if name.is_empty() || manifest.startup.is_empty() {
                tracing::warn!(
                    "Candidate {} is missing a name or startup entry, skipping",
                    path.display()
                );
                continue;
            }
            let Some(priority) = resolve_priority(manifest.priority.as_ref()) else {
                tracing::warn!(
                    "Candidate {} carries an unusable priority token, skipping",
                    path.display()
                );
                continue;
            };

            return Some(UnitDescriptor {
                name,
                startup: manifest.startup,
                version: manifest.version.unwrap_or_else(|| "0.0.0".to_string()),
                priority,
                folder_path: path.to_path_buf(),
                verifier_index: index,
            });
        }
        None
    }
}

/// Recognizes and loads native dylib units for one manifest convention.
pub struct DylibVerifier {
    kind: &'static str,
    manifest_file: &'static str,
    init_symbol: &'static [u8],
}

impl DylibVerifier {
    /// Current convention: `hearth.json` + `hearth_unit_init`.
    pub fn hearth() -> Self {
        Self {
            kind: "hearth",
            manifest_file: "hearth.json",
            init_symbol: b"hearth_unit_init",
        }
    }

    /// Pre-1.0 convention: `module.json` + `module_init`.
    pub fn classic() -> Self {
        Self {
            kind: "classic",
            manifest_file: "module.json",
            init_symbol: b"module_init",
        }
    }
}

#[async_trait]
impl Verifier for DylibVerifier {
    fn kind(&self) -> &str {
        self.kind
    }

    fn recognize(&self, path: &Path) -> Result<Option<UnitManifest>, UnitError> {
        if !path.is_dir() {
            return Ok(None);
        }

        let primary = path.join(self.manifest_file);
        if primary.exists() {
            match UnitManifest::from_file(&primary) {
                Ok(manifest) => return Ok(Some(manifest)),
                Err(e) => {
                    tracing::warn!(
                        "Unreadable {} in {}, attempting derivation: {}",
                        self.manifest_file,
                        path.display(),
                        e
                    );
                }
            }
        }

        let derived = match UnitManifest::from_package(path)
            .or_else(|_| UnitManifest::from_single_file(path))
        {
            Ok(manifest) => manifest,
            Err(_) => return Ok(None),
        };

        if let Err(e) = derived.persist(&primary) {
            tracing::warn!(
                "Could not cache synthesized manifest for {}: {}",
                path.display(),
                e
            );
        }
        Ok(Some(derived))
    }

    async fn load(
        &self,
        descriptor: &UnitDescriptor,
        platform: Arc<Platform>,
    ) -> Result<UnitInstance, UnitError> {
        let library_path = descriptor.folder_path.join(&descriptor.startup);
        if !library_path.exists() {
            return Err(UnitError::Load(format!(
                "Startup entry not found: {}",
                library_path.display()
            )));
        }

        let library = unsafe {
            Library::new(&library_path)
                .map_err(|e| UnitError::Load(format!("Failed to load library: {}", e)))?
        };

        let init_fn: Symbol<UnitInitFn> = unsafe {
            library
                .get(self.init_symbol)
                .map_err(|e| UnitError::Load(format!("Failed to find init symbol: {}", e)))?
        };

        let unit: Arc<dyn Unit> = unsafe {
            let unit_ptr = init_fn();
            if unit_ptr.is_null() {
                return Err(UnitError::Load("Unit init returned null".to_string()));
            }
            Arc::from(Box::from_raw(unit_ptr))
        };

        let config = platform
            .config
            .load_config(&descriptor.folder_path, &descriptor.name)
            .map_err(|e| UnitError::Load(format!("Failed to load unit config: {}", e)))?;
        unit.set_config(config);

        Ok(UnitInstance {
            unit,
            library: Some(library),
        })
    }
}
