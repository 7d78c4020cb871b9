//! In-process presence bus.

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::domain::{BridgeError, PresenceBridge, PresenceEnvelope};

const DEFAULT_CAPACITY: usize = 256;

/// Presence bus shared by hub instances in the same process.
///
/// Clone the bridge to hand it to another instance; all clones share one bus.
#[derive(Debug, Clone)]
pub struct LocalBridge {
    tx: broadcast::Sender<PresenceEnvelope>,
}

impl LocalBridge {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }
}

impl Default for LocalBridge {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PresenceBridge for LocalBridge {
    fn is_enabled(&self) -> bool {
        true
    }

    async fn publish(&self, envelope: PresenceEnvelope) -> Result<(), BridgeError> {
        // no subscribers is not an error: there may be no other instance yet
        let _ = self.tx.send(envelope);
        Ok(())
    }

    fn subscribe(&self) -> Option<broadcast::Receiver<PresenceEnvelope>> {
        Some(self.tx.subscribe())
    }
}
