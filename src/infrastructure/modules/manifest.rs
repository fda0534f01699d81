//! Unit manifests
//!
//! A unit directory normally carries a primary manifest (structured JSON:
//! name, startup, version, priority). Directories without one can still be
//! recognized through the package-style secondary manifest, or as a final
//! fallback through a single entry-point file; either derivation is written
//! back to disk as a synthesized primary manifest so the next discovery
//! skips the derivation.

use crate::application::errors::UnitError;
use crate::domain::entities::{normalize_name, PriorityToken};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Package-style secondary manifest file name.
pub const SECONDARY_MANIFEST: &str = "package.json";

/// Primary unit manifest.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct UnitManifest {
    pub name: String,
    pub startup: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<PriorityToken>,
}

/// Secondary package-style manifest, used only for derivation.
#[derive(Debug, Clone, Deserialize)]
pub struct PackageManifest {
    pub name: String,
    pub main: String,
    #[serde(default)]
    pub version: Option<String>,
}

impl UnitManifest {
    pub fn from_file(path: &Path) -> Result<Self, UnitError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| UnitError::Manifest(format!("Failed to read manifest: {}", e)))?;
        serde_json::from_str(&content)
            .map_err(|e| UnitError::Manifest(format!("Failed to parse manifest: {}", e)))
    }

    /// Derive a minimal manifest from the directory's secondary manifest.
    pub fn from_package(folder: &Path) -> Result<Self, UnitError> {
        let content = std::fs::read_to_string(folder.join(SECONDARY_MANIFEST))
            .map_err(|e| UnitError::Manifest(format!("Failed to read package manifest: {}", e)))?;
        let pkg: PackageManifest = serde_json::from_str(&content)
            .map_err(|e| UnitError::Manifest(format!("Failed to parse package manifest: {}", e)))?;

        Ok(Self {
            name: normalize_name(&pkg.name),
            startup: pkg.main,
            version: pkg.version,
            priority: None,
        })
    }

    /// Last-resort derivation: a directory containing exactly one file is
    /// treated as a unit whose entry point is that file.
    pub fn from_single_file(folder: &Path) -> Result<Self, UnitError> {
        let mut files = Vec::new();
        let entries = std::fs::read_dir(folder)
            .map_err(|e| UnitError::Manifest(format!("Failed to read directory: {}", e)))?;
        for entry in entries {
            let entry =
                entry.map_err(|e| UnitError::Manifest(format!("Failed to read entry: {}", e)))?;
            files.push(entry.file_name().to_string_lossy().to_string());
        }
        if files.len() != 1 {
            return Err(UnitError::Manifest(format!(
                "Expected exactly one file in {}, found {}",
                folder.display(),
                files.len()
            )));
        }

        let startup = files.remove(0);
        let name = folder
            .file_name()
            .map(|n| normalize_name(&n.to_string_lossy()))
            .unwrap_or_default();
        Ok(Self {
            name,
            startup,
            version: None,
            priority: None,
        })
    }

    /// Write a synthesized manifest to `path`. Returns whether anything was
    /// written: a file already holding this manifest is left untouched so
    /// repeated discoveries do not cause a rewrite storm.
    pub fn persist(&self, path: &Path) -> Result<bool, UnitError> {
        if let Ok(existing) = Self::from_file(path) {
            if existing == *self {
                return Ok(false);
            }
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| UnitError::Manifest(format!("Failed to serialize manifest: {}", e)))?;
        std::fs::write(path, content)
            .map_err(|e| UnitError::Manifest(format!("Failed to write manifest: {}", e)))?;
        Ok(true)
    }
}
