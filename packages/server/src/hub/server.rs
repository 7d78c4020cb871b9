//! Server actor: registry of live sessions, active houses and known users.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use tokio::sync::{broadcast, mpsc, oneshot};

use super::{
    client::ClientHandle,
    error::HubError,
    house::HouseHandle,
    message::{self, Message},
};
use crate::{
    config::HubConfig,
    domain::{
        HouseId, HouseName, HouseRecord, HouseRepository, InstanceId, PresenceBridge,
        PresenceEnvelope, PresenceEvent, SessionId, User, UserId, UserRepository,
    },
};

#[derive(Debug)]
enum ServerCommand {
    Register(ClientHandle),
    Unregister(SessionId),
    JoinableHouse {
        name: HouseName,
        private: bool,
        reply: oneshot::Sender<Result<HouseHandle, HubError>>,
    },
    FindHouseById {
        id: HouseId,
        reply: oneshot::Sender<Option<HouseHandle>>,
    },
    FindUser {
        id: UserId,
        reply: oneshot::Sender<Option<User>>,
    },
    FindClients {
        id: UserId,
        reply: oneshot::Sender<Vec<ClientHandle>>,
    },
    Houses(oneshot::Sender<Vec<HouseHandle>>),
    Stats(oneshot::Sender<ServerStats>),
    Remote(PresenceEnvelope),
}

/// Counters reported by the health endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerStats {
    pub clients: usize,
    pub houses: usize,
    pub known_users: usize,
    /// Frames discarded by the drop-oldest overflow policy, live sessions only
    pub dropped_frames: u64,
}

/// Address of the running server actor.
#[derive(Debug, Clone)]
pub struct ServerHandle {
    commands: mpsc::Sender<ServerCommand>,
}

impl ServerHandle {
    /// Load known users and start the server loop.
    ///
    /// Failing to load users is fatal to startup.
    pub async fn spawn(
        user_repository: Arc<dyn UserRepository>,
        house_repository: Arc<dyn HouseRepository>,
        bridge: Arc<dyn PresenceBridge>,
        config: Arc<HubConfig>,
    ) -> Result<Self, HubError> {
        let known_users = user_repository.get_all_users().await?;
        tracing::info!("Loaded {} known users", known_users.len());

        let instance = InstanceId::generate();
        let (commands, rx) = mpsc::channel(config.command_capacity);

        if bridge.is_enabled() {
            if let Some(events) = bridge.subscribe() {
                tokio::spawn(listen_presence(instance, events, commands.downgrade()));
            }
        }

        let actor = ServerActor {
            instance,
            user_repository,
            house_repository,
            bridge,
            config,
            known_users,
            clients: HashMap::new(),
            houses: HashMap::new(),
        };
        tokio::spawn(actor.run(rx));

        Ok(Self { commands })
    }

    pub(crate) async fn register(&self, client: ClientHandle) -> Result<(), HubError> {
        self.send(ServerCommand::Register(client)).await
    }

    pub async fn unregister(&self, session_id: SessionId) -> Result<(), HubError> {
        self.send(ServerCommand::Unregister(session_id)).await
    }

    /// Find an active or persisted house by name, creating it when unknown.
    ///
    /// Lookup and creation run inside the server loop, so concurrent calls
    /// for the same name resolve to one house.
    pub async fn joinable_house(
        &self,
        name: HouseName,
        private: bool,
    ) -> Result<HouseHandle, HubError> {
        self.request(|reply| ServerCommand::JoinableHouse {
            name,
            private,
            reply,
        })
        .await?
    }

    /// Active houses only
    pub async fn find_house_by_id(&self, id: HouseId) -> Result<Option<HouseHandle>, HubError> {
        self.request(|reply| ServerCommand::FindHouseById { id, reply })
            .await
    }

    /// Look a user up in the known-user cache, falling back to the repository
    pub async fn find_user(&self, id: UserId) -> Result<Option<User>, HubError> {
        self.request(|reply| ServerCommand::FindUser { id, reply })
            .await
    }

    /// Live sessions of a user
    pub async fn find_clients(&self, id: UserId) -> Result<Vec<ClientHandle>, HubError> {
        self.request(|reply| ServerCommand::FindClients { id, reply })
            .await
    }

    /// Active houses ordered by name
    pub async fn houses(&self) -> Result<Vec<HouseHandle>, HubError> {
        self.request(ServerCommand::Houses).await
    }

    pub async fn stats(&self) -> Result<ServerStats, HubError> {
        self.request(ServerCommand::Stats).await
    }

    async fn send(&self, command: ServerCommand) -> Result<(), HubError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| HubError::ServerStopped)
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> ServerCommand,
    ) -> Result<T, HubError> {
        let (reply, rx) = oneshot::channel();
        self.send(command(reply)).await?;
        rx.await.map_err(|_| HubError::ServerStopped)
    }
}

/// Forward presence events published by other instances into the server loop.
async fn listen_presence(
    instance: InstanceId,
    mut events: broadcast::Receiver<PresenceEnvelope>,
    commands: mpsc::WeakSender<ServerCommand>,
) {
    loop {
        match events.recv().await {
            Ok(envelope) if envelope.origin == instance => {}
            Ok(envelope) => {
                let Some(commands) = commands.upgrade() else {
                    break;
                };
                if commands.send(ServerCommand::Remote(envelope)).await.is_err() {
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!("Presence listener lagged; skipped {} events", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
    tracing::debug!("Presence listener stopped");
}

struct ServerActor {
    instance: InstanceId,
    user_repository: Arc<dyn UserRepository>,
    house_repository: Arc<dyn HouseRepository>,
    bridge: Arc<dyn PresenceBridge>,
    config: Arc<HubConfig>,
    known_users: Vec<User>,
    clients: HashMap<SessionId, ClientHandle>,
    houses: HashMap<HouseId, HouseHandle>,
}

impl ServerActor {
    async fn run(mut self, mut rx: mpsc::Receiver<ServerCommand>) {
        while let Some(command) = rx.recv().await {
            match command {
                ServerCommand::Register(client) => self.register(client).await,
                ServerCommand::Unregister(session_id) => self.unregister(session_id).await,
                ServerCommand::JoinableHouse {
                    name,
                    private,
                    reply,
                } => {
                    let result = self.joinable_house(name, private).await;
                    let _ = reply.send(result);
                }
                ServerCommand::FindHouseById { id, reply } => {
                    let _ = reply.send(self.houses.get(&id).cloned());
                }
                ServerCommand::FindUser { id, reply } => {
                    let user = self.find_user(id).await;
                    let _ = reply.send(user);
                }
                ServerCommand::FindClients { id, reply } => {
                    let clients = self
                        .clients
                        .values()
                        .filter(|c| c.user.id == id)
                        .cloned()
                        .collect();
                    let _ = reply.send(clients);
                }
                ServerCommand::Houses(reply) => {
                    let mut houses: Vec<HouseHandle> = self.houses.values().cloned().collect();
                    houses.sort_by(|a, b| a.name().as_str().cmp(b.name().as_str()));
                    let _ = reply.send(houses);
                }
                ServerCommand::Stats(reply) => {
                    let _ = reply.send(ServerStats {
                        clients: self.clients.len(),
                        houses: self.houses.len(),
                        known_users: self.known_users.len(),
                        dropped_frames: self.clients.values().map(|c| c.dropped_frames()).sum(),
                    });
                }
                ServerCommand::Remote(envelope) => self.apply_remote(envelope.event),
            }
        }
        tracing::debug!("Server loop stopped");
    }

    async fn register(&mut self, client: ClientHandle) {
        let user = client.user.clone();
        if !self.is_known(&user.id) {
            if let Err(e) = self.user_repository.add_user(user.clone()).await {
                tracing::warn!("Failed to persist user '{}': {}", user.name, e);
            }
            self.known_users.push(user.clone());
        }

        self.publish(PresenceEvent::Joined(user.clone())).await;

        // snapshot of known users, one notification per identity, in a single
        // frame so it takes one slot of the outbound queue
        let mut seen = HashSet::new();
        let snapshot: Vec<Message> = self
            .known_users
            .iter()
            .filter(|known| seen.insert(known.id))
            .map(message::user_join)
            .collect();
        if let Some(frame) = message::encode_batch(&snapshot) {
            if client.deliver(frame).is_gone() {
                tracing::warn!(
                    "Session {} went away before its user snapshot",
                    client.session_id
                );
            }
        }

        tracing::info!(
            "Session {} registered for '{}' ({} live)",
            client.session_id,
            user.name,
            self.clients.len() + 1
        );
        self.clients.insert(client.session_id, client);
    }

    async fn find_user(&mut self, id: UserId) -> Option<User> {
        if let Some(user) = self.known_users.iter().find(|u| u.id == id) {
            return Some(user.clone());
        }
        match self.user_repository.find_by_id(&id).await {
            Ok(Some(user)) => {
                tracing::debug!("User '{}' loaded from repository", user.name);
                self.known_users.push(user.clone());
                Some(user)
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("Failed to look up user {}: {}", id, e);
                None
            }
        }
    }

    async fn unregister(&mut self, session_id: SessionId) {
        let Some(client) = self.clients.remove(&session_id) else {
            return;
        };
        tracing::info!(
            "Session {} of '{}' unregistered ({} live)",
            session_id,
            client.user.name,
            self.clients.len()
        );
        self.publish(PresenceEvent::Left(client.user)).await;
    }

    async fn joinable_house(
        &mut self,
        name: HouseName,
        private: bool,
    ) -> Result<HouseHandle, HubError> {
        if let Some(house) = self.houses.values().find(|h| h.name() == &name) {
            return Ok(house.clone());
        }

        if let Some(record) = self.house_repository.find_by_name(&name).await? {
            tracing::info!("House '{}' loaded from repository", record.name);
            return Ok(self.start_house(&record));
        }

        let record = HouseRecord::create(name, private);
        self.house_repository.add(record.clone()).await?;
        tracing::info!(
            "House '{}' created ({})",
            record.name,
            if record.private { "private" } else { "public" }
        );
        Ok(self.start_house(&record))
    }

    fn start_house(&mut self, record: &HouseRecord) -> HouseHandle {
        let house = HouseHandle::spawn(record, &self.config);
        self.houses.insert(record.id, house.clone());
        house
    }

    fn is_known(&self, id: &UserId) -> bool {
        self.known_users.iter().any(|u| &u.id == id)
    }

    async fn publish(&self, event: PresenceEvent) {
        if !self.bridge.is_enabled() {
            return;
        }
        let envelope = PresenceEnvelope {
            origin: self.instance,
            event,
        };
        if let Err(e) = self.bridge.publish(envelope).await {
            tracing::warn!("Failed to publish presence event: {}", e);
        }
    }

    fn apply_remote(&mut self, event: PresenceEvent) {
        let notification = match event {
            PresenceEvent::Joined(user) => {
                if !self.is_known(&user.id) {
                    self.known_users.push(user.clone());
                }
                message::user_join(&user)
            }
            PresenceEvent::Left(user) => {
                if let Some(index) = self.known_users.iter().position(|u| u.id == user.id) {
                    self.known_users.swap_remove(index);
                }
                message::user_left(&user)
            }
        };
        self.broadcast(&notification);
    }

    fn broadcast(&mut self, message: &Message) {
        let Some(frame) = message::encode(message) else {
            return;
        };
        self.clients
            .retain(|_, client| !client.deliver(frame.clone()).is_gone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{
            RepositoryError,
            repository::{MockHouseRepository, MockUserRepository},
        },
        hub::{
            client::test_support::{attach_user, recv_messages},
            message::Action,
        },
        infrastructure::{
            pubsub::{DisabledBridge, LocalBridge},
            repository::{InMemoryHouseRepository, InMemoryUserRepository},
        },
    };

    async fn spawn_server(users: Vec<User>) -> ServerHandle {
        let user_repository = InMemoryUserRepository::new();
        for user in users {
            user_repository.add_user(user).await.unwrap();
        }
        ServerHandle::spawn(
            Arc::new(user_repository),
            Arc::new(InMemoryHouseRepository::new()),
            Arc::new(DisabledBridge),
            Arc::new(HubConfig::default()),
        )
        .await
        .unwrap()
    }

    fn house_name(name: &str) -> HouseName {
        HouseName::new(name.to_string()).unwrap()
    }

    #[tokio::test]
    async fn test_spawn_fails_when_users_cannot_be_loaded() {
        // テスト項目: 起動時にユーザー一覧を取得できなければ起動に失敗する
        // given (前提条件):
        let mut user_repository = MockUserRepository::new();
        user_repository
            .expect_get_all_users()
            .returning(|| Err(RepositoryError::Unavailable("down".into())));

        // when (操作):
        let result = ServerHandle::spawn(
            Arc::new(user_repository),
            Arc::new(MockHouseRepository::new()),
            Arc::new(DisabledBridge),
            Arc::new(HubConfig::default()),
        )
        .await;

        // then (期待する結果):
        assert!(matches!(result, Err(HubError::Repository(_))));
    }

    #[tokio::test]
    async fn test_register_sends_deduplicated_user_snapshot() {
        // テスト項目: 登録時に既知ユーザーの一覧が重複なく user-join として届く
        // given (前提条件):
        let bob = User::new(UserId::generate(), "bob");
        let server = spawn_server(vec![bob.clone()]).await;
        let alice = User::new(UserId::generate(), "alice");
        let (first, _first_rx) = attach_user(alice.clone());
        let (second, mut second_rx) = attach_user(alice.clone());
        server.register(first).await.unwrap();

        // when (操作):
        server.register(second).await.unwrap();
        let stats = server.stats().await.unwrap();

        // then (期待する結果):
        let names: Vec<String> = recv_messages(&mut second_rx)
            .into_iter()
            .inspect(|m| assert_eq!(m.action, Action::UserJoin))
            .filter_map(|m| m.sender.map(|s| s.name))
            .collect();
        assert_eq!(names, vec!["bob".to_string(), "alice".to_string()]);
        assert_eq!(stats.clients, 2);
        assert_eq!(stats.known_users, 2);
    }

    #[tokio::test]
    async fn test_user_snapshot_takes_one_queue_slot() {
        // テスト項目: 既知ユーザーが送信キュー容量より多くても、一覧は 1 フレームで届きセッションは退去させられない
        // given (前提条件): 既知ユーザー 20 人、容量 1 の送信キュー
        let users: Vec<User> = (0..20)
            .map(|i| User::new(UserId::generate(), format!("user{i}")))
            .collect();
        let server = spawn_server(users).await;
        let (carol, mut carol_rx) =
            crate::hub::client::test_support::attach_with_capacity("carol", 1);

        // when (操作):
        server.register(carol).await.unwrap();
        let stats = server.stats().await.unwrap();

        // then (期待する結果):
        assert_eq!(carol_rx.len(), 1);
        let snapshot = recv_messages(&mut carol_rx);
        assert_eq!(snapshot.len(), 21);
        assert!(snapshot.iter().all(|m| m.action == Action::UserJoin));
        assert_eq!(stats.clients, 1);
        assert_eq!(stats.dropped_frames, 0);
    }

    #[tokio::test]
    async fn test_find_user_falls_back_to_repository() {
        // テスト項目: キャッシュにないユーザーはリポジトリから引かれ、以降はキャッシュに載る
        // given (前提条件): 起動後にリポジトリへ追加されたユーザー
        let user_repository = Arc::new(InMemoryUserRepository::new());
        let server = ServerHandle::spawn(
            user_repository.clone(),
            Arc::new(InMemoryHouseRepository::new()),
            Arc::new(DisabledBridge),
            Arc::new(HubConfig::default()),
        )
        .await
        .unwrap();
        let dave = User::new(UserId::generate(), "dave");
        user_repository.add_user(dave.clone()).await.unwrap();

        // when (操作):
        let found = server.find_user(dave.id).await.unwrap();
        let missing = server.find_user(UserId::generate()).await.unwrap();
        let stats = server.stats().await.unwrap();

        // then (期待する結果):
        assert_eq!(found, Some(dave));
        assert_eq!(missing, None);
        assert_eq!(stats.known_users, 1);
    }

    #[tokio::test]
    async fn test_register_persists_new_users_once() {
        // テスト項目: 未知のユーザーは一度だけ永続化される
        // given (前提条件):
        let alice = User::new(UserId::generate(), "alice");
        let mut user_repository = MockUserRepository::new();
        user_repository
            .expect_get_all_users()
            .returning(|| Ok(Vec::new()));
        user_repository
            .expect_add_user()
            .times(1)
            .returning(|_| Ok(()));
        let server = ServerHandle::spawn(
            Arc::new(user_repository),
            Arc::new(MockHouseRepository::new()),
            Arc::new(DisabledBridge),
            Arc::new(HubConfig::default()),
        )
        .await
        .unwrap();

        // when (操作):
        let (first, _a) = attach_user(alice.clone());
        let (second, _b) = attach_user(alice.clone());
        server.register(first).await.unwrap();
        server.register(second).await.unwrap();

        // then (期待する結果):
        assert_eq!(server.find_user(alice.id).await.unwrap(), Some(alice));
    }

    #[tokio::test]
    async fn test_unregister_keeps_known_users() {
        // テスト項目: 登録解除でライブセットからは消えるが既知ユーザーは残る
        // given (前提条件):
        let server = spawn_server(Vec::new()).await;
        let alice = User::new(UserId::generate(), "alice");
        let (client, _rx) = attach_user(alice.clone());
        let session_id = client.session_id;
        server.register(client).await.unwrap();

        // when (操作):
        server.unregister(session_id).await.unwrap();
        server.unregister(session_id).await.unwrap();

        // then (期待する結果):
        assert!(server.find_clients(alice.id).await.unwrap().is_empty());
        let stats = server.stats().await.unwrap();
        assert_eq!(stats.clients, 0);
        assert_eq!(stats.known_users, 1);
    }

    #[tokio::test]
    async fn test_joinable_house_creates_once() {
        // テスト項目: 同名のハウスは一度だけ作成され、以降は同じハウスが返る
        // given (前提条件):
        let server = spawn_server(Vec::new()).await;

        // when (操作):
        let (first, second) = tokio::join!(
            server.joinable_house(house_name("general"), false),
            server.joinable_house(house_name("general"), false),
        );

        // then (期待する結果):
        let (first, second) = (first.unwrap(), second.unwrap());
        assert_eq!(first.id(), second.id());
        assert_eq!(server.houses().await.unwrap().len(), 1);
        assert!(
            server
                .find_house_by_id(first.id())
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn test_joinable_house_loads_persisted_house() {
        // テスト項目: 永続化済みのハウスは ID を保ったまま読み込まれる
        // given (前提条件):
        let record = HouseRecord::create(house_name("archive"), true);
        let server = ServerHandle::spawn(
            Arc::new(InMemoryUserRepository::new()),
            Arc::new(InMemoryHouseRepository::with_houses([record.clone()])),
            Arc::new(DisabledBridge),
            Arc::new(HubConfig::default()),
        )
        .await
        .unwrap();

        // when (操作):
        let house = server
            .joinable_house(house_name("archive"), false)
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(house.id(), record.id);
        assert!(house.is_private());
    }

    #[tokio::test]
    async fn test_joinable_house_reports_repository_failure() {
        // テスト項目: リポジトリ障害は呼び出し元にエラーとして返り、サーバーは動き続ける
        // given (前提条件):
        let mut house_repository = MockHouseRepository::new();
        house_repository
            .expect_find_by_name()
            .returning(|_| Err(RepositoryError::Unavailable("down".into())));
        let server = ServerHandle::spawn(
            Arc::new(InMemoryUserRepository::new()),
            Arc::new(house_repository),
            Arc::new(DisabledBridge),
            Arc::new(HubConfig::default()),
        )
        .await
        .unwrap();

        // when (操作):
        let result = server.joinable_house(house_name("general"), false).await;

        // then (期待する結果):
        assert!(matches!(result, Err(HubError::Repository(_))));
        assert!(server.stats().await.is_ok());
    }

    #[tokio::test]
    async fn test_presence_from_other_instance_is_broadcast() {
        // テスト項目: 別インスタンスの参加イベントがこのインスタンスの全クライアントに届く
        // given (前提条件): 同じバスを共有する 2 つのサーバー
        let bridge = LocalBridge::new();
        let spawn = |bridge: LocalBridge| async move {
            ServerHandle::spawn(
                Arc::new(InMemoryUserRepository::new()),
                Arc::new(InMemoryHouseRepository::new()),
                Arc::new(bridge),
                Arc::new(HubConfig::default()),
            )
            .await
            .unwrap()
        };
        let first = spawn(bridge.clone()).await;
        let second = spawn(bridge).await;
        let alice = User::new(UserId::generate(), "alice");
        let bob = User::new(UserId::generate(), "bob");
        let (alice_client, mut alice_rx) = attach_user(alice.clone());
        first.register(alice_client).await.unwrap();
        first.stats().await.unwrap();
        recv_messages(&mut alice_rx);

        // when (操作):
        let (bob_client, _bob_rx) = attach_user(bob.clone());
        second.register(bob_client).await.unwrap();
        let mut known = None;
        for _ in 0..50 {
            known = first.find_user(bob.id).await.unwrap();
            if known.is_some() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }

        // then (期待する結果):
        assert_eq!(known, Some(bob.clone()));
        let received = recv_messages(&mut alice_rx);
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].action, Action::UserJoin);
        assert_eq!(received[0].sender.as_ref().map(|s| s.name.as_str()), Some("bob"));
    }
}
