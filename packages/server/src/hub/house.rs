//! House actor: top-level topic scope owning its members and rooms.

use std::collections::HashMap;

use tokio::sync::{mpsc, oneshot};

use super::{
    client::ClientHandle,
    error::HubError,
    members::Members,
    message::{self, HouseRef, Message},
    room::RoomHandle,
};
use crate::{
    config::HubConfig,
    domain::{HouseId, HouseName, HouseRecord, RoomId, RoomName, SessionId, User},
};

#[derive(Debug)]
enum HouseCommand {
    Register(ClientHandle),
    Unregister(SessionId),
    Broadcast(Message),
    JoinRoom {
        name: RoomName,
        private: bool,
        client: ClientHandle,
        reply: oneshot::Sender<Option<RoomHandle>>,
    },
    Snapshot(oneshot::Sender<(Vec<User>, Vec<RoomHandle>)>),
}

/// Point-in-time view of a room
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomSnapshot {
    pub id: RoomId,
    pub name: RoomName,
    pub private: bool,
    pub members: Vec<User>,
}

/// Point-in-time view of a house and its rooms
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HouseSnapshot {
    pub id: HouseId,
    pub name: HouseName,
    pub private: bool,
    pub members: Vec<User>,
    pub rooms: Vec<RoomSnapshot>,
}

/// Address of a running house.
#[derive(Debug, Clone)]
pub struct HouseHandle {
    id: HouseId,
    name: HouseName,
    private: bool,
    commands: mpsc::Sender<HouseCommand>,
}

impl HouseHandle {
    /// Start the command loop of a house.
    pub(crate) fn spawn(record: &HouseRecord, config: &HubConfig) -> Self {
        let (commands, rx) = mpsc::channel(config.command_capacity);
        let handle = Self {
            id: record.id,
            name: record.name.clone(),
            private: record.private,
            commands,
        };
        let actor = HouseActor {
            id: record.id,
            scope: format!("house '{}'", record.name),
            reference: handle.reference(),
            command_capacity: config.command_capacity,
            members: Members::default(),
            rooms: HashMap::new(),
        };
        tokio::spawn(actor.run(rx));
        handle
    }

    pub fn id(&self) -> HouseId {
        self.id
    }

    pub fn name(&self) -> &HouseName {
        &self.name
    }

    pub fn is_private(&self) -> bool {
        self.private
    }

    pub fn reference(&self) -> HouseRef {
        HouseRef {
            id: self.id.to_string(),
            name: self.name.to_string(),
            private: self.private,
        }
    }

    pub(crate) async fn register(&self, client: ClientHandle) -> Result<(), HubError> {
        self.send(HouseCommand::Register(client)).await
    }

    /// Remove a session from the house and from all of its rooms.
    pub async fn unregister(&self, session_id: SessionId) -> Result<(), HubError> {
        self.send(HouseCommand::Unregister(session_id)).await
    }

    pub async fn broadcast(&self, message: Message) -> Result<(), HubError> {
        self.send(HouseCommand::Broadcast(message)).await
    }

    /// Join the room `name`, creating it with the given privacy on first
    /// reference.
    ///
    /// Returns `None` when the client is not a member of this house, or when
    /// the existing room's privacy differs from `private`.
    pub(crate) async fn join_room(
        &self,
        name: RoomName,
        private: bool,
        client: ClientHandle,
    ) -> Result<Option<RoomHandle>, HubError> {
        let (reply, rx) = oneshot::channel();
        self.send(HouseCommand::JoinRoom {
            name,
            private,
            client,
            reply,
        })
        .await?;
        rx.await.map_err(|_| self.stopped())
    }

    pub async fn snapshot(&self) -> Result<HouseSnapshot, HubError> {
        let (reply, rx) = oneshot::channel();
        self.send(HouseCommand::Snapshot(reply)).await?;
        let (members, room_handles) = rx.await.map_err(|_| self.stopped())?;

        let mut rooms = Vec::with_capacity(room_handles.len());
        for room in room_handles {
            rooms.push(RoomSnapshot {
                id: room.id(),
                name: room.name().clone(),
                private: room.is_private(),
                members: room.members().await?,
            });
        }
        rooms.sort_by(|a, b| a.name.as_str().cmp(b.name.as_str()));

        Ok(HouseSnapshot {
            id: self.id,
            name: self.name.clone(),
            private: self.private,
            members,
            rooms,
        })
    }

    async fn send(&self, command: HouseCommand) -> Result<(), HubError> {
        self.commands.send(command).await.map_err(|_| self.stopped())
    }

    fn stopped(&self) -> HubError {
        HubError::HouseStopped(self.name.to_string())
    }
}

struct HouseActor {
    id: HouseId,
    scope: String,
    reference: HouseRef,
    command_capacity: usize,
    members: Members,
    rooms: HashMap<RoomName, RoomHandle>,
}

impl HouseActor {
    async fn run(mut self, mut rx: mpsc::Receiver<HouseCommand>) {
        while let Some(command) = rx.recv().await {
            match command {
                HouseCommand::Register(client) => self.register(client).await,
                HouseCommand::Unregister(session_id) => self.unregister(session_id).await,
                HouseCommand::Broadcast(message) => self.broadcast(&message).await,
                HouseCommand::JoinRoom {
                    name,
                    private,
                    client,
                    reply,
                } => {
                    let room = self.join_room(name, private, client).await;
                    let _ = reply.send(room);
                }
                HouseCommand::Snapshot(reply) => {
                    let rooms = self.rooms.values().cloned().collect();
                    let _ = reply.send((self.members.users(), rooms));
                }
            }
        }
        tracing::debug!("{} stopped", self.scope);
    }

    async fn register(&mut self, client: ClientHandle) {
        if self.members.contains(&client.session_id) {
            return;
        }
        // existing members only; the joiner is not in the set yet
        let welcome = message::welcome_to_house(self.reference.clone(), &client.user);
        self.broadcast(&welcome).await;
        tracing::info!("'{}' joined {}", client.user.name, self.scope);
        self.members.insert(client);
        tracing::debug!("{} now has {} members", self.scope, self.members.len());
    }

    async fn unregister(&mut self, session_id: SessionId) {
        if !self.members.remove(&session_id) {
            return;
        }
        tracing::info!("Session {} left {}", session_id, self.scope);
        self.leave_rooms(session_id).await;
    }

    /// Deliver to every member. Sessions dropped from the house on the way
    /// are dropped from its rooms as well.
    async fn broadcast(&mut self, message: &Message) {
        let Some(frame) = message::encode(message) else {
            return;
        };
        for session_id in self.members.deliver(&frame, &self.scope) {
            self.leave_rooms(session_id).await;
        }
    }

    async fn leave_rooms(&self, session_id: SessionId) {
        for room in self.rooms.values() {
            if let Err(e) = room.unregister(session_id).await {
                tracing::warn!("Failed to leave room in {}: {}", self.scope, e);
            }
        }
    }

    async fn join_room(
        &mut self,
        name: RoomName,
        private: bool,
        client: ClientHandle,
    ) -> Option<RoomHandle> {
        if !self.members.contains(&client.session_id) {
            tracing::debug!(
                "'{}' is not a member of {}; ignoring room join",
                client.user.name,
                self.scope
            );
            return None;
        }

        let room = match self.rooms.get(&name) {
            Some(room) if room.is_private() != private => {
                tracing::debug!(
                    "'{}' asked for a {} room but '{}' in {} is not",
                    client.user.name,
                    if private { "private" } else { "public" },
                    name,
                    self.scope
                );
                return None;
            }
            Some(room) => room.clone(),
            None => {
                let room = RoomHandle::spawn(
                    RoomId::generate(),
                    name.clone(),
                    private,
                    self.id,
                    self.reference.clone(),
                    self.command_capacity,
                );
                tracing::info!(
                    "{} room '{}' created in {}",
                    if private { "Private" } else { "Public" },
                    name,
                    self.scope
                );
                self.rooms.insert(name, room.clone());
                room
            }
        };

        match room.register(client).await {
            Ok(()) => Some(room),
            Err(e) => {
                tracing::warn!("Failed to join room in {}: {}", self.scope, e);
                None
            }
        }
    }
}
