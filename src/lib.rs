//! hearth - plugin lifecycle core for a long-running chat-bot host
//!
//! Discovers, verifies, loads, orders, starts and unloads two plugin
//! families: module units (command/behavior plugins, kept in a
//! priority-ordered registry) and output integrations (adapters to external
//! chat surfaces, driven by a one-shot select/configure/start/stop state
//! machine). One misbehaving plugin never corrupts shared state or aborts
//! the batch it arrived in.

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::errors::{ConfigError, IntegrationError, LifecycleError, UnitError};
pub use application::events::{EventBus, EventKind, LifecycleEvent};
pub use domain::entities::{IntegrationDescriptor, Platform, UnitDescriptor};
pub use domain::traits::{
    ChatBridge, ConfigStore, EventSink, Integration, MemoryConfigStore, Scanner, Unit,
};
pub use infrastructure::config::HostConfig;
pub use infrastructure::integrations::IntegrationManager;
pub use infrastructure::modules::{ModuleLoader, UnitRegistry, VerifierChain};
