//! Adapter wrapping a bare chat bridge into the integration contract

use crate::application::errors::IntegrationError;
use crate::domain::traits::{ChatBridge, EventSink, Integration};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

/// An entry point that only implements [`ChatBridge`] is wrapped into this
/// adapter at selection time, so the lifecycle manager can drive every
/// selected integration through one contract.
pub struct BridgedIntegration {
    name: String,
    bridge: Arc<dyn ChatBridge>,
}

impl BridgedIntegration {
    pub fn new(bridge: Arc<dyn ChatBridge>) -> Self {
        let name = bridge.info().name;
        Self { name, bridge }
    }

    pub fn bridge(&self) -> &Arc<dyn ChatBridge> {
        &self.bridge
    }
}

#[async_trait]
impl Integration for BridgedIntegration {
    fn name(&self) -> &str {
        &self.name
    }

    async fn start(&self, sink: EventSink) -> Result<(), IntegrationError> {
        self.bridge.connect().await?;
        sink.emit("connected", json!({ "bridge": self.bridge.info().id }));
        Ok(())
    }

    async fn stop(&self) -> Result<(), IntegrationError> {
        self.bridge.disconnect().await
    }
}
