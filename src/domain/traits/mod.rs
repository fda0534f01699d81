//! Domain traits - runtime contracts and collaborator seams

pub mod bridge;
pub mod integration;
pub mod store;
pub mod unit;

pub use bridge::{BridgeInfo, BridgeInitFn, ChatBridge};
pub use integration::{
    EventSink, Integration, IntegrationEvent, IntegrationInitFn, LoadedEntry,
};
pub use store::{ConfigSection, ConfigStore, MemoryConfigStore, Scanner};
pub use unit::{Unit, UnitInitFn};
