//! Infrastructure layer - host config, filesystem scanning and the two
//! plugin lifecycle managers.

pub mod config;
pub mod integrations;
pub mod modules;
pub mod scanner;
