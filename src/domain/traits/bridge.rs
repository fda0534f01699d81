//! Chat-adapter abstraction for bridged integrations

use crate::application::errors::IntegrationError;
use async_trait::async_trait;

/// Bridge information
#[derive(Debug, Clone)]
pub struct BridgeInfo {
    pub id: String,
    pub name: String,
}

/// Abstraction over an external chat surface. Entry points that only know
/// how to talk to a chat service implement this instead of the full
/// [`Integration`](super::Integration) contract, and the lifecycle manager
/// wraps them through an adapter.
#[async_trait]
pub trait ChatBridge: Send + Sync {
    fn info(&self) -> BridgeInfo;

    /// Connect to the chat surface and begin relaying events.
    async fn connect(&self) -> Result<(), IntegrationError>;

    async fn disconnect(&self) -> Result<(), IntegrationError>;

    /// Send a message to a thread on the surface.
    async fn send_message(&self, thread_id: &str, text: &str) -> Result<(), IntegrationError>;
}

/// Function signature for bridge initialization inside a dylib.
pub type BridgeInitFn = extern "C" fn() -> *mut dyn ChatBridge;
