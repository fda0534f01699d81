//! Application layer errors

use thiserror::Error;

/// Lifecycle ordering violations. These always surface to the caller:
/// they indicate a host programming error, not a bad plugin.
#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("Lifecycle state error: {0}")]
    State(String),

    #[error("Unit not loaded: {0}")]
    NotLoaded(String),

    #[error("Unit '{0}' already loaded")]
    DuplicateName(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Per-unit faults during verification or loading. Callers catch and log
/// these; they never abort a batch.
#[derive(Error, Debug)]
pub enum UnitError {
    #[error("Manifest error: {0}")]
    Manifest(String),

    #[error("Load error: {0}")]
    Load(String),

    #[error("Post-load hook failed: {0}")]
    Hook(String),

    #[error("Unload hook failed: {0}")]
    Unload(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Integration faults
#[derive(Error, Debug)]
pub enum IntegrationError {
    #[error("Integration state error: {0}")]
    State(String),

    #[error("Failed to load integration: {0}")]
    Load(String),

    #[error("Failed to start integration: {0}")]
    Start(String),

    #[error("Failed to stop integration: {0}")]
    Stop(String),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Not found: {0}")]
    NotFound(String),
}
