//! Room actor: a sub-scope of a house with its own membership.
//!
//! Rooms are created and registered through their parent house only, so a
//! room member is always a member of the house too.

use tokio::sync::{mpsc, oneshot};

use super::{
    client::ClientHandle,
    error::HubError,
    members::Members,
    message::{self, HouseRef, Message, RoomRef},
};
use crate::domain::{HouseId, RoomId, RoomName, SessionId, User};

#[derive(Debug)]
enum RoomCommand {
    Register(ClientHandle),
    Unregister(SessionId),
    Broadcast(Message),
    Members(oneshot::Sender<Vec<User>>),
}

/// Address of a running room.
#[derive(Debug, Clone)]
pub struct RoomHandle {
    id: RoomId,
    name: RoomName,
    private: bool,
    house_id: HouseId,
    commands: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub(crate) fn spawn(
        id: RoomId,
        name: RoomName,
        private: bool,
        house_id: HouseId,
        house: HouseRef,
        capacity: usize,
    ) -> Self {
        let (commands, rx) = mpsc::channel(capacity);
        let handle = Self {
            id,
            name,
            private,
            house_id,
            commands,
        };
        let actor = RoomActor {
            scope: format!("room '{}'", handle.name),
            house,
            room: handle.reference(),
            private,
            members: Members::default(),
        };
        tokio::spawn(actor.run(rx));
        handle
    }

    pub fn id(&self) -> RoomId {
        self.id
    }

    pub fn name(&self) -> &RoomName {
        &self.name
    }

    pub fn is_private(&self) -> bool {
        self.private
    }

    pub fn house_id(&self) -> HouseId {
        self.house_id
    }

    pub fn reference(&self) -> RoomRef {
        RoomRef {
            id: self.id.to_string(),
            name: self.name.to_string(),
            private: self.private,
        }
    }

    pub(crate) async fn register(&self, client: ClientHandle) -> Result<(), HubError> {
        self.send(RoomCommand::Register(client)).await
    }

    pub async fn unregister(&self, session_id: SessionId) -> Result<(), HubError> {
        self.send(RoomCommand::Unregister(session_id)).await
    }

    pub async fn broadcast(&self, message: Message) -> Result<(), HubError> {
        self.send(RoomCommand::Broadcast(message)).await
    }

    pub async fn members(&self) -> Result<Vec<User>, HubError> {
        let (reply, rx) = oneshot::channel();
        self.send(RoomCommand::Members(reply)).await?;
        rx.await
            .map_err(|_| HubError::RoomStopped(self.name.to_string()))
    }

    async fn send(&self, command: RoomCommand) -> Result<(), HubError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| HubError::RoomStopped(self.name.to_string()))
    }
}

struct RoomActor {
    scope: String,
    house: HouseRef,
    room: RoomRef,
    private: bool,
    members: Members,
}

impl RoomActor {
    async fn run(mut self, mut rx: mpsc::Receiver<RoomCommand>) {
        while let Some(command) = rx.recv().await {
            match command {
                RoomCommand::Register(client) => self.register(client),
                RoomCommand::Unregister(session_id) => {
                    if self.members.remove(&session_id) {
                        tracing::debug!("Session {} left {}", session_id, self.scope);
                    }
                }
                RoomCommand::Broadcast(message) => {
                    if let Some(frame) = message::encode(&message) {
                        self.members.deliver(&frame, &self.scope);
                    }
                }
                RoomCommand::Members(reply) => {
                    let _ = reply.send(self.members.users());
                }
            }
        }
        tracing::debug!("{} stopped", self.scope);
    }

    fn register(&mut self, client: ClientHandle) {
        if self.members.contains(&client.session_id) {
            return;
        }
        if !self.private {
            // existing members only; the joiner is not in the set yet
            let welcome =
                message::welcome_to_room(self.house.clone(), self.room.clone(), &client.user);
            if let Some(frame) = message::encode(&welcome) {
                self.members.deliver(&frame, &self.scope);
            }
        }
        tracing::debug!("'{}' joined {}", client.user.name, self.scope);
        self.members.insert(client);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::{
        client::test_support::{attach, recv_messages},
        message::Action,
    };

    fn spawn_room(private: bool) -> RoomHandle {
        RoomHandle::spawn(
            RoomId::generate(),
            RoomName::new("lobby".to_string()).unwrap(),
            private,
            HouseId::generate(),
            HouseRef::default(),
            16,
        )
    }

    #[tokio::test]
    async fn test_public_room_welcomes_existing_members_only() {
        // テスト項目: 公開ルームへの参加は既存メンバーにだけ通知され、参加者自身には届かない
        // given (前提条件):
        let room = spawn_room(false);
        let (alice, mut alice_rx) = attach("alice");
        let (bob, mut bob_rx) = attach("bob");
        room.register(alice).await.unwrap();

        // when (操作):
        room.register(bob).await.unwrap();
        room.members().await.unwrap();

        // then (期待する結果):
        let to_alice = recv_messages(&mut alice_rx);
        assert_eq!(to_alice.len(), 1);
        assert_eq!(to_alice[0].action, Action::UserJoin);
        assert_eq!(to_alice[0].message, "bob joined the room");
        assert!(recv_messages(&mut bob_rx).is_empty());
    }

    #[tokio::test]
    async fn test_private_room_join_is_silent() {
        // テスト項目: 非公開ルームへの参加は誰にも通知されない
        // given (前提条件):
        let room = spawn_room(true);
        let (alice, mut alice_rx) = attach("alice");
        let (bob, _bob_rx) = attach("bob");
        room.register(alice).await.unwrap();

        // when (操作):
        room.register(bob).await.unwrap();
        let members = room.members().await.unwrap();

        // then (期待する結果):
        assert_eq!(members.len(), 2);
        assert!(recv_messages(&mut alice_rx).is_empty());
    }

    #[tokio::test]
    async fn test_register_and_unregister_are_idempotent() {
        // テスト項目: 登録・解除を繰り返しても、メンバーは正味で登録されているセッションだけになる
        // given (前提条件):
        let room = spawn_room(false);
        let (alice, _alice_rx) = attach("alice");
        let (bob, _bob_rx) = attach("bob");
        let bob_session = bob.session_id;

        // when (操作):
        room.register(alice.clone()).await.unwrap();
        room.register(alice.clone()).await.unwrap();
        room.register(bob).await.unwrap();
        room.unregister(bob_session).await.unwrap();
        room.unregister(bob_session).await.unwrap();
        let members = room.members().await.unwrap();

        // then (期待する結果):
        assert_eq!(members, vec![alice.user.clone()]);
    }

    #[tokio::test]
    async fn test_broadcast_reaches_every_member() {
        // テスト項目: ブロードキャストは送信時点の全メンバーに届く
        // given (前提条件):
        let room = spawn_room(true);
        let (alice, mut alice_rx) = attach("alice");
        let (bob, mut bob_rx) = attach("bob");
        let (carol, mut carol_rx) = attach("carol");
        room.register(alice).await.unwrap();
        room.register(bob).await.unwrap();

        // when (操作):
        room.broadcast(Message::new(Action::SendMessage).with_message("hi"))
            .await
            .unwrap();
        room.register(carol).await.unwrap();
        room.members().await.unwrap();

        // then (期待する結果):
        assert_eq!(recv_messages(&mut alice_rx)[0].message, "hi");
        assert_eq!(recv_messages(&mut bob_rx)[0].message, "hi");
        assert!(recv_messages(&mut carol_rx).is_empty());
    }
}
