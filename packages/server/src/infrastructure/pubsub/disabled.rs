//! No-op presence bridge.

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::domain::{BridgeError, PresenceBridge, PresenceEnvelope};

#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledBridge;

#[async_trait]
impl PresenceBridge for DisabledBridge {
    fn is_enabled(&self) -> bool {
        false
    }

    async fn publish(&self, _envelope: PresenceEnvelope) -> Result<(), BridgeError> {
        Ok(())
    }

    fn subscribe(&self) -> Option<broadcast::Receiver<PresenceEnvelope>> {
        None
    }
}
