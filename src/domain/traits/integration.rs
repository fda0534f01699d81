//! Integration runtime contract and event sink

use crate::application::errors::IntegrationError;
use crate::domain::entities::Platform;
use crate::domain::traits::bridge::ChatBridge;
use crate::domain::traits::store::ConfigSection;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;

/// An event raised by a running integration. `event_source` is always the
/// name of the integration the event came from.
#[derive(Debug, Clone)]
pub struct IntegrationEvent {
    pub event_source: String,
    pub kind: String,
    pub payload: Value,
}

/// Sink handed to an integration on start. Every event emitted through it
/// is tagged with the originating integration's name before delivery.
#[derive(Clone)]
pub struct EventSink {
    source: String,
    tx: mpsc::UnboundedSender<IntegrationEvent>,
}

impl EventSink {
    pub fn new(tx: mpsc::UnboundedSender<IntegrationEvent>) -> Self {
        Self {
            source: String::new(),
            tx,
        }
    }

    /// A sink that stamps `event_source` with the given name.
    pub fn tagged(&self, source: &str) -> EventSink {
        EventSink {
            source: source.to_string(),
            tx: self.tx.clone(),
        }
    }

    pub fn emit(&self, kind: impl Into<String>, payload: Value) {
        let _ = self.tx.send(IntegrationEvent {
            event_source: self.source.clone(),
            kind: kind.into(),
            payload,
        });
    }
}

/// Contract every output integration satisfies.
#[async_trait]
pub trait Integration: Send + Sync {
    fn name(&self) -> &str;

    fn set_platform(&self, _platform: Arc<Platform>) {}

    fn set_config(&self, _config: ConfigSection) {}

    /// Begin delivering chat events into `sink`.
    async fn start(&self, sink: EventSink) -> Result<(), IntegrationError>;

    async fn stop(&self) -> Result<(), IntegrationError>;
}

/// What an integration entry point turned out to be: a full integration, or
/// a bare chat bridge that still needs wrapping.
pub enum LoadedEntry {
    Integration(Arc<dyn Integration>),
    Bridge(Arc<dyn ChatBridge>),
}

/// Function signature for integration initialization inside a dylib.
pub type IntegrationInitFn = extern "C" fn() -> *mut dyn Integration;
