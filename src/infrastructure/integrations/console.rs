//! Built-in console integration for local development

use crate::application::errors::IntegrationError;
use crate::domain::entities::Platform;
use crate::domain::traits::{ConfigSection, EventSink, Integration};
use async_trait::async_trait;
use serde_json::json;
use std::sync::{Arc, RwLock};

/// Name of the reserved built-in integration, always present in `list()`.
pub const CONSOLE_INTEGRATION: &str = "console";

/// Terminal-backed output channel. Ships with the host so there is always
/// at least one integration to select.
#[derive(Default)]
pub struct ConsoleIntegration {
    platform: RwLock<Option<Arc<Platform>>>,
    config: RwLock<Option<ConfigSection>>,
}

impl ConsoleIntegration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn say(&self, text: &str) {
        println!("[BOT] {}", text);
    }

    pub fn platform(&self) -> Option<Arc<Platform>> {
        self.platform
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn config(&self) -> Option<ConfigSection> {
        self.config
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl Integration for ConsoleIntegration {
    fn name(&self) -> &str {
        CONSOLE_INTEGRATION
    }

    fn set_platform(&self, platform: Arc<Platform>) {
        *self.platform.write().unwrap_or_else(|e| e.into_inner()) = Some(platform);
    }

    fn set_config(&self, config: ConfigSection) {
        *self.config.write().unwrap_or_else(|e| e.into_inner()) = Some(config);
    }

    async fn start(&self, sink: EventSink) -> Result<(), IntegrationError> {
        tracing::info!("Starting console integration (dev mode)");
        sink.emit("started", json!({}));
        Ok(())
    }

    async fn stop(&self) -> Result<(), IntegrationError> {
        tracing::info!("Stopping console integration");
        Ok(())
    }
}
