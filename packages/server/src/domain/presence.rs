//! Cross-process presence bridge interface.
//!
//! Hub instances publish user join/leave events so that several instances
//! could share presence state. The bridge is disabled unless configured.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::broadcast;
use uuid::Uuid;

use super::User;

/// Identifies one hub instance on the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstanceId(Uuid);

impl InstanceId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresenceEvent {
    Joined(User),
    Left(User),
}

/// An event tagged with the instance that published it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceEnvelope {
    pub origin: InstanceId,
    pub event: PresenceEvent,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    #[error("presence bus rejected event: {0}")]
    Publish(String),
}

#[async_trait]
pub trait PresenceBridge: Send + Sync {
    /// Whether events should be published at all
    fn is_enabled(&self) -> bool;

    async fn publish(&self, envelope: PresenceEnvelope) -> Result<(), BridgeError>;

    /// Subscribe to events from every instance (including this one)
    fn subscribe(&self) -> Option<broadcast::Receiver<PresenceEnvelope>>;
}
