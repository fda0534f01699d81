//! Module unit lifecycle: verification, priority registry, load and unload
//! orchestration.

pub mod loader;
pub mod manifest;
pub mod registry;
pub mod verifier;

pub use loader::{ModuleLoader, BUILTIN_UNIT};
pub use manifest::{PackageManifest, UnitManifest, SECONDARY_MANIFEST};
pub use registry::{LoadedUnit, UnitRegistry};
pub use verifier::{DylibVerifier, UnitInstance, Verifier, VerifierChain};
