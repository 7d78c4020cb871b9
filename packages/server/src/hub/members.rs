//! Membership set shared by the house and room actors.

use std::collections::HashMap;

use super::{
    client::ClientHandle,
    outbound::{Delivery, OutboundFrame},
};
use crate::domain::{SessionId, User};

#[derive(Debug, Default)]
pub(crate) struct Members {
    clients: HashMap<SessionId, ClientHandle>,
}

impl Members {
    /// Returns `false` when the session was already a member.
    pub(crate) fn insert(&mut self, client: ClientHandle) -> bool {
        if self.clients.contains_key(&client.session_id) {
            return false;
        }
        self.clients.insert(client.session_id, client);
        true
    }

    pub(crate) fn remove(&mut self, session_id: &SessionId) -> bool {
        self.clients.remove(session_id).is_some()
    }

    pub(crate) fn contains(&self, session_id: &SessionId) -> bool {
        self.clients.contains_key(session_id)
    }

    pub(crate) fn len(&self) -> usize {
        self.clients.len()
    }

    /// Push a frame to every member. Members whose session is gone (closed or
    /// evicted) are removed and returned; their sessions unregister through
    /// disconnect.
    pub(crate) fn deliver(&mut self, frame: &OutboundFrame, scope: &str) -> Vec<SessionId> {
        let mut gone = Vec::new();
        self.clients.retain(|session_id, client| {
            match client.deliver(frame.clone()) {
                Delivery::Queued => return true,
                Delivery::DisplacedOldest => {
                    tracing::debug!(
                        "Dropped oldest frame for '{}' in {}: outbound queue full",
                        client.user.name,
                        scope
                    );
                    return true;
                }
                Delivery::Evicted => tracing::warn!(
                    "Evicting session {} ('{}') from {}: outbound queue full",
                    session_id,
                    client.user.name,
                    scope
                ),
                Delivery::Closed => {}
            }
            gone.push(*session_id);
            false
        });
        gone
    }

    /// Member identities ordered by display name
    pub(crate) fn users(&self) -> Vec<User> {
        let mut users: Vec<User> = self.clients.values().map(|c| c.user.clone()).collect();
        users.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        users
    }
}
