//! Domain layer - entities and runtime contracts

pub mod entities;
pub mod traits;
