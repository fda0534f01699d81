//! Application layer - errors and lifecycle event plumbing

pub mod errors;
pub mod events;

pub use errors::{ConfigError, IntegrationError, LifecycleError, UnitError};
pub use events::{EventBus, EventKind, LifecycleEvent};
