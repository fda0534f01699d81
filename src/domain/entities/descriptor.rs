//! Descriptors - normalized metadata for units and integrations

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw priority token as it appears in a manifest: a number, or one of the
/// words `first` / `last` / `normal`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum PriorityToken {
    Number(i64),
    Tag(String),
}

/// Resolve a raw priority token to an ordering key.
///
/// `first` pins a unit to the front of the registry, `last` to the back,
/// `normal` and an absent token mean 0. Any other word is unusable and
/// yields `None`, which rejects the descriptor.
pub fn resolve_priority(token: Option<&PriorityToken>) -> Option<i64> {
    match token {
        None => Some(0),
        Some(PriorityToken::Number(n)) => Some(*n),
        Some(PriorityToken::Tag(tag)) => match tag.as_str() {
            "first" => Some(i64::MIN),
            "last" => Some(i64::MAX),
            "normal" => Some(0),
            _ => None,
        },
    }
}

/// Normalize a plugin name: lowercase, spaces become hyphens.
pub fn normalize_name(raw: &str) -> String {
    raw.trim().to_lowercase().replace(' ', "-")
}

/// A verified module candidate, ready to load.
#[derive(Debug, Clone)]
pub struct UnitDescriptor {
    /// Normalized name, unique among loaded units.
    pub name: String,
    /// Entry point, relative to `folder_path`.
    pub startup: String,
    pub version: String,
    /// Resolved ordering key (see [`resolve_priority`]).
    pub priority: i64,
    pub folder_path: PathBuf,
    /// Index of the verifier strategy that recognized this candidate; the
    /// same strategy performs the load.
    pub verifier_index: usize,
}

/// A discovered output integration.
#[derive(Debug, Clone)]
pub struct IntegrationDescriptor {
    pub name: String,
    pub startup: String,
    pub folder_path: PathBuf,
}
