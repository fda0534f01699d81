//! Domain entities

pub mod descriptor;
pub mod platform;

pub use descriptor::{
    normalize_name, resolve_priority, IntegrationDescriptor, PriorityToken, UnitDescriptor,
};
pub use platform::Platform;
