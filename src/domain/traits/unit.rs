//! Unit runtime contract

use crate::application::errors::UnitError;
use crate::domain::entities::Platform;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Contract every loaded module unit satisfies. All hooks are optional;
/// the defaults do nothing.
#[async_trait]
pub trait Unit: Send + Sync {
    fn name(&self) -> &str;

    fn version(&self) -> &str {
        "0.0.0"
    }

    /// Receive the unit's own configuration object before the post-load hook.
    fn set_config(&self, _config: Value) {}

    /// Post-load hook, bound to the hosting platform context.
    async fn load(&self, _platform: Arc<Platform>) -> Result<(), UnitError> {
        Ok(())
    }

    /// Pre-unload hook.
    async fn unload(&self) -> Result<(), UnitError> {
        Ok(())
    }
}

/// Function signature for unit initialization inside a dylib.
pub type UnitInitFn = extern "C" fn() -> *mut dyn Unit;
