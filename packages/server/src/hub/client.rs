//! Client session: the bridge between one transport connection and the hub.
//!
//! A session runs two pumps. The read pump decodes inbound frames and
//! dispatches them to the server, houses and rooms. The write pump is the
//! only consumer of the outbound queue: it coalesces queued frames into one
//! transport write, sends keep-alive pings and enforces the write deadline.

use std::{collections::HashMap, fmt, sync::Arc, time::Duration};

use futures_util::{SinkExt, StreamExt};
use tokio::{
    sync::{mpsc, oneshot},
    time::{Instant, interval_at, sleep_until, timeout},
};
use yakata_shared::protocol::{FRAME_SEPARATOR, split_frame};

use super::{
    error::HubError,
    house::HouseHandle,
    message::{self, Action, Message},
    outbound::{Delivery, Eviction, OutboundFrame, OutboundReceiver, OutboundSender, outbound_queue},
    room::RoomHandle,
    server::ServerHandle,
    transport::{Frame, FrameSink, FrameStream, TransportError},
};
use crate::{
    config::HubConfig,
    domain::{HouseId, HouseName, RoomId, RoomName, SessionId, User, UserId},
};

/// Requests from other sessions, handled by the read pump.
#[derive(Debug)]
pub(crate) enum SessionControl {
    /// Join a private house opened by `inviter`
    Invite { house: HouseHandle, inviter: User },
}

/// Address of a live session, held by the actors it is a member of.
#[derive(Debug, Clone)]
pub struct ClientHandle {
    pub session_id: SessionId,
    pub user: User,
    outbound: OutboundSender,
    control: mpsc::Sender<SessionControl>,
}

impl ClientHandle {
    /// Enqueue an encoded frame without waiting.
    pub fn deliver(&self, frame: OutboundFrame) -> Delivery {
        self.outbound.send(frame)
    }

    /// Frames this session lost to the drop-oldest overflow policy
    pub fn dropped_frames(&self) -> u64 {
        self.outbound.dropped()
    }

    fn invite(&self, house: HouseHandle, inviter: User) -> bool {
        self.control
            .try_send(SessionControl::Invite { house, inviter })
            .is_ok()
    }
}

/// Why a session ended
#[derive(Debug)]
enum SessionEnd {
    /// Close frame or end of stream
    Closed,
    Evicted,
    Transport(TransportError),
    WriterStopped,
}

impl fmt::Display for SessionEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => f.write_str("closed by peer"),
            Self::Evicted => f.write_str("evicted: outbound queue overflow"),
            Self::Transport(e) => write!(f, "{}", e),
            Self::WriterStopped => f.write_str("write pump stopped"),
        }
    }
}

/// A connected session, ready to run over a transport.
pub struct Session {
    dispatcher: Dispatcher,
    outbound_rx: OutboundReceiver,
    eviction: Eviction,
    control_rx: mpsc::Receiver<SessionControl>,
}

impl Session {
    /// Create a session for an authenticated user and enqueue its registration.
    pub async fn connect(
        server: ServerHandle,
        user: User,
        config: Arc<HubConfig>,
    ) -> Result<Self, HubError> {
        let (outbound, outbound_rx, eviction) =
            outbound_queue(config.outbound_capacity, config.overflow_policy);
        let (control, control_rx) = mpsc::channel(config.control_capacity);
        let handle = ClientHandle {
            session_id: SessionId::generate(),
            user,
            outbound,
            control,
        };

        server.register(handle.clone()).await?;
        tracing::info!(
            "Session {} opened for '{}'",
            handle.session_id,
            handle.user.name
        );

        Ok(Self {
            dispatcher: Dispatcher {
                handle,
                server,
                config,
                houses: HashMap::new(),
                rooms: HashMap::new(),
                disconnected: false,
            },
            outbound_rx,
            eviction,
            control_rx,
        })
    }

    /// Drive the session until the transport fails, the peer closes or the
    /// session is evicted, then disconnect it from the hub.
    pub async fn run(self, mut stream: FrameStream, sink: FrameSink) {
        let Session {
            mut dispatcher,
            outbound_rx,
            eviction,
            mut control_rx,
        } = self;
        let config = dispatcher.config.clone();
        let session_id = dispatcher.handle.session_id;

        let (close_tx, close_rx) = oneshot::channel();
        let mut writer = tokio::spawn(write_pump(sink, outbound_rx, close_rx, config.clone()));

        let mut writer_finished = false;
        let end = tokio::select! {
            end = dispatcher.read_pump(&mut stream, &eviction, &mut control_rx) => end,
            joined = &mut writer => {
                writer_finished = true;
                match joined {
                    Ok(Ok(())) => SessionEnd::WriterStopped,
                    Ok(Err(e)) => SessionEnd::Transport(e),
                    Err(e) => {
                        tracing::error!("Write pump of session {} panicked: {}", session_id, e);
                        SessionEnd::WriterStopped
                    }
                }
            }
        };
        tracing::info!(
            "Session {} of '{}' ending: {}",
            session_id,
            dispatcher.handle.user.name,
            end
        );
        let dropped = dispatcher.handle.dropped_frames();
        if dropped > 0 {
            tracing::warn!(
                "Session {} lost {} frames to outbound overflow",
                session_id,
                dropped
            );
        }

        dispatcher.disconnect().await;

        if !writer_finished {
            let _ = close_tx.send(());
            // flushing the remainder and the close frame are two writes
            match timeout(config.write_wait * 2, &mut writer).await {
                Ok(Ok(Err(e))) => {
                    tracing::debug!("Write pump of session {} failed on close: {}", session_id, e)
                }
                Ok(_) => {}
                Err(_) => {
                    tracing::warn!("Write pump of session {} did not stop in time", session_id);
                    writer.abort();
                }
            }
        }
        drop(stream);
        tracing::info!("Session {} closed", session_id);
    }
}

/// Per-session routing state, owned by the read pump.
struct Dispatcher {
    handle: ClientHandle,
    server: ServerHandle,
    config: Arc<HubConfig>,
    houses: HashMap<HouseId, HouseHandle>,
    rooms: HashMap<RoomId, RoomHandle>,
    disconnected: bool,
}

impl Dispatcher {
    async fn read_pump(
        &mut self,
        stream: &mut FrameStream,
        eviction: &Eviction,
        control_rx: &mut mpsc::Receiver<SessionControl>,
    ) -> SessionEnd {
        let pong_wait = self.config.pong_wait;
        let mut deadline = Instant::now() + pong_wait;

        loop {
            tokio::select! {
                _ = eviction.evicted() => return SessionEnd::Evicted,
                Some(control) = control_rx.recv() => self.handle_control(control).await,
                _ = sleep_until(deadline) => {
                    return SessionEnd::Transport(TransportError::ReadTimeout(pong_wait));
                }
                frame = stream.next() => {
                    deadline = Instant::now() + pong_wait;
                    match frame {
                        None | Some(Ok(Frame::Close)) => return SessionEnd::Closed,
                        Some(Err(e)) => return SessionEnd::Transport(e),
                        Some(Ok(Frame::Ping | Frame::Pong)) => {}
                        Some(Ok(Frame::Text(text))) => {
                            if text.len() > self.config.max_message_size {
                                return SessionEnd::Transport(TransportError::Read(format!(
                                    "frame of {} bytes exceeds the {} byte limit",
                                    text.len(),
                                    self.config.max_message_size
                                )));
                            }
                            self.handle_text(&text).await;
                        }
                    }
                }
            }
        }
    }

    async fn handle_text(&mut self, text: &str) {
        for line in split_frame(text) {
            match Message::from_json(line) {
                Ok(message) => self.dispatch(message).await,
                Err(e) => tracing::warn!(
                    "Dropping malformed message from '{}': {}",
                    self.handle.user.name,
                    e
                ),
            }
        }
    }

    async fn dispatch(&mut self, mut message: Message) {
        // never trust the sender a client claims
        message.sender = Some(message::client_ref(&self.handle.user));

        match message.action {
            Action::SendMessage => self.send_message(message).await,
            Action::JoinHouse => self.join_house(message).await,
            Action::LeaveHouse => self.leave_house(message).await,
            Action::JoinHousePrivate => self.join_house_private(message).await,
            Action::JoinRoom => self.join_room(message, false).await,
            Action::JoinRoomPrivate => self.join_room(message, true).await,
            Action::LeaveRoom => self.leave_room(message).await,
            other => tracing::debug!(
                "Ignoring {:?} message from '{}'",
                other,
                self.handle.user.name
            ),
        }
    }

    async fn send_message(&mut self, mut message: Message) {
        let Some(house) = self.joined_house(message.house.as_ref().map(|h| h.id.as_str())) else {
            tracing::debug!(
                "'{}' sent to a house it has not joined",
                self.handle.user.name
            );
            return;
        };
        message.house = Some(house.reference());

        let room_id = message.room.as_ref().map(|room| room.id.clone());
        let result = match room_id {
            None => house.broadcast(message).await,
            Some(room_id) => {
                let room = RoomId::parse(&room_id)
                    .ok()
                    .and_then(|id| self.rooms.get(&id))
                    .filter(|room| room.house_id() == house.id())
                    .cloned();
                let Some(room) = room else {
                    tracing::debug!(
                        "'{}' sent to a room it has not joined",
                        self.handle.user.name
                    );
                    return;
                };
                message.room = Some(room.reference());
                room.broadcast(message).await
            }
        };
        if let Err(e) = result {
            tracing::warn!("Failed to broadcast: {}", e);
        }
    }

    async fn join_house(&mut self, message: Message) {
        let raw = match message.house {
            Some(house) if message.message.trim().is_empty() => house.name,
            _ => message.message,
        };
        let name = match HouseName::new(raw) {
            Ok(name) => name,
            Err(e) => {
                tracing::debug!("Invalid house name from '{}': {}", self.handle.user.name, e);
                return;
            }
        };

        match self.server.joinable_house(name, false).await {
            Ok(house) if house.is_private() => tracing::debug!(
                "'{}' may not join private house '{}' by name",
                self.handle.user.name,
                house.name()
            ),
            Ok(house) => {
                self.join(&house, None).await;
            }
            Err(e) => tracing::warn!("Failed to resolve house: {}", e),
        }
    }

    /// Join a house unless already a member, then confirm to this session.
    async fn join(&mut self, house: &HouseHandle, counterpart: Option<&User>) -> bool {
        if self.houses.contains_key(&house.id()) {
            return false;
        }
        if let Err(e) = house.register(self.handle.clone()).await {
            tracing::warn!("Failed to join house '{}': {}", house.name(), e);
            return false;
        }
        self.houses.insert(house.id(), house.clone());
        self.deliver_to_self(&message::house_joined(house.reference(), counterpart));
        true
    }

    async fn leave_house(&mut self, message: Message) {
        let id = match message.house.as_ref() {
            Some(house) if !house.id.is_empty() => house.id.as_str(),
            _ => message.message.as_str(),
        };
        let Some(house) = HouseId::parse(id)
            .ok()
            .and_then(|id| self.houses.remove(&id))
        else {
            tracing::debug!(
                "'{}' tried to leave a house it has not joined",
                self.handle.user.name
            );
            return;
        };

        // the house also drops us from its rooms
        self.rooms.retain(|_, room| room.house_id() != house.id());
        if let Err(e) = house.unregister(self.handle.session_id).await {
            tracing::warn!("Failed to leave house '{}': {}", house.name(), e);
        }
    }

    async fn join_house_private(&mut self, message: Message) {
        let Ok(target_id) = UserId::parse(&message.message) else {
            tracing::debug!("Invalid private join target '{}'", message.message);
            return;
        };
        if target_id == self.handle.user.id {
            tracing::debug!("'{}' tried to open a private house with itself", self.handle.user.name);
            return;
        }

        let target = match self.server.find_user(target_id).await {
            Ok(Some(target)) => target,
            Ok(None) => {
                tracing::debug!("Private join target {} is unknown", target_id);
                return;
            }
            Err(e) => {
                tracing::warn!("Failed to look up user: {}", e);
                return;
            }
        };

        let name = HouseName::private_pair(&self.handle.user.id, &target.id);
        let house = match self.server.joinable_house(name, true).await {
            Ok(house) => house,
            Err(e) => {
                tracing::warn!("Failed to open private house: {}", e);
                return;
            }
        };
        self.join(&house, Some(&target)).await;

        let clients = match self.server.find_clients(target.id).await {
            Ok(clients) => clients,
            Err(e) => {
                tracing::warn!("Failed to find sessions of '{}': {}", target.name, e);
                return;
            }
        };
        for client in clients {
            if !client.invite(house.clone(), self.handle.user.clone()) {
                tracing::warn!(
                    "Could not invite session {} of '{}'",
                    client.session_id,
                    target.name
                );
            }
        }
    }

    /// Join (or create) a room of a joined house. Rooms keep the privacy
    /// they were created with; a join asking for the other kind is refused.
    async fn join_room(&mut self, message: Message, private: bool) {
        let Some(house) = self.joined_house(message.house.as_ref().map(|h| h.id.as_str())) else {
            tracing::debug!(
                "'{}' tried to join a room outside its houses",
                self.handle.user.name
            );
            return;
        };
        let raw = match message.room {
            Some(room) if message.message.trim().is_empty() => room.name,
            _ => message.message,
        };
        let name = match RoomName::new(raw) {
            Ok(name) => name,
            Err(e) => {
                tracing::debug!("Invalid room name from '{}': {}", self.handle.user.name, e);
                return;
            }
        };

        match house.join_room(name, private, self.handle.clone()).await {
            Ok(Some(room)) => {
                if self.rooms.insert(room.id(), room.clone()).is_none() {
                    self.deliver_to_self(&message::room_joined(
                        house.reference(),
                        room.reference(),
                    ));
                }
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("Failed to join room: {}", e),
        }
    }

    async fn leave_room(&mut self, message: Message) {
        let Some(room) = message
            .room
            .as_ref()
            .and_then(|room| RoomId::parse(&room.id).ok())
            .and_then(|id| self.rooms.remove(&id))
        else {
            tracing::debug!(
                "'{}' tried to leave a room it has not joined",
                self.handle.user.name
            );
            return;
        };
        if let Err(e) = room.unregister(self.handle.session_id).await {
            tracing::warn!("Failed to leave room '{}': {}", room.name(), e);
        }
    }

    async fn handle_control(&mut self, control: SessionControl) {
        match control {
            SessionControl::Invite { house, inviter } => {
                self.join(&house, Some(&inviter)).await;
                self.deliver_to_self(&message::invite(
                    house.reference(),
                    &inviter,
                    &self.handle.user,
                ));
            }
        }
    }

    fn joined_house(&self, id: Option<&str>) -> Option<HouseHandle> {
        let id = HouseId::parse(id?).ok()?;
        self.houses.get(&id).cloned()
    }

    fn deliver_to_self(&self, message: &Message) {
        if let Some(frame) = message::encode(message) {
            self.handle.deliver(frame);
        }
    }

    /// Leave the server and every joined house and room, then close the
    /// outbound queue. Safe to call more than once.
    async fn disconnect(&mut self) {
        if self.disconnected {
            return;
        }
        self.disconnected = true;
        let session_id = self.handle.session_id;

        if let Err(e) = self.server.unregister(session_id).await {
            tracing::warn!("Failed to unregister session {}: {}", session_id, e);
        }
        for (_, room) in self.rooms.drain() {
            if let Err(e) = room.unregister(session_id).await {
                tracing::debug!("Room already gone: {}", e);
            }
        }
        for (_, house) in self.houses.drain() {
            if let Err(e) = house.unregister(session_id).await {
                tracing::debug!("House already gone: {}", e);
            }
        }
        self.handle.outbound.close();
    }
}

/// Drain the outbound queue into the transport until told to close.
async fn write_pump(
    mut sink: FrameSink,
    mut rx: OutboundReceiver,
    mut close: oneshot::Receiver<()>,
    config: Arc<HubConfig>,
) -> Result<(), TransportError> {
    let write_wait = config.write_wait;
    let mut ticker = interval_at(Instant::now() + config.ping_period, config.ping_period);

    loop {
        tokio::select! {
            frame = rx.recv() => {
                let Some(first) = frame else {
                    return write_frame(&mut sink, Frame::Close, write_wait).await;
                };
                let text = coalesce(first, &mut rx);
                write_frame(&mut sink, Frame::Text(text), write_wait).await?;
            }
            _ = ticker.tick() => {
                write_frame(&mut sink, Frame::Ping, write_wait).await?;
            }
            _ = &mut close => {
                rx.close();
                if let Some(first) = rx.recv().await {
                    let text = coalesce(first, &mut rx);
                    write_frame(&mut sink, Frame::Text(text), write_wait).await?;
                }
                return write_frame(&mut sink, Frame::Close, write_wait).await;
            }
        }
    }
}

/// Join `first` with the frames already queued behind it.
fn coalesce(first: OutboundFrame, rx: &mut OutboundReceiver) -> String {
    let queued = rx.len();
    let mut text = String::from(&*first);
    for _ in 0..queued {
        let Some(next) = rx.try_recv() else {
            break;
        };
        text.push(FRAME_SEPARATOR);
        text.push_str(&next);
    }
    text
}

async fn write_frame(
    sink: &mut FrameSink,
    frame: Frame,
    write_wait: Duration,
) -> Result<(), TransportError> {
    match timeout(write_wait, sink.send(frame)).await {
        Ok(result) => result,
        Err(_) => Err(TransportError::WriteTimeout(write_wait)),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::hub::outbound::OverflowPolicy;

    /// A client handle without a running session, and its outbound queue.
    pub(crate) fn attach(name: &str) -> (ClientHandle, OutboundReceiver) {
        attach_user(User::new(UserId::generate(), name))
    }

    pub(crate) fn attach_user(user: User) -> (ClientHandle, OutboundReceiver) {
        attach_inner(user, 64)
    }

    pub(crate) fn attach_with_capacity(
        name: &str,
        capacity: usize,
    ) -> (ClientHandle, OutboundReceiver) {
        attach_inner(User::new(UserId::generate(), name), capacity)
    }

    fn attach_inner(user: User, capacity: usize) -> (ClientHandle, OutboundReceiver) {
        let (outbound, rx, _eviction) = outbound_queue(capacity, OverflowPolicy::Disconnect);
        let (control, _control_rx) = mpsc::channel(4);
        let handle = ClientHandle {
            session_id: SessionId::generate(),
            user,
            outbound,
            control,
        };
        (handle, rx)
    }

    /// Everything queued so far, decoded
    pub(crate) fn recv_messages(rx: &mut OutboundReceiver) -> Vec<Message> {
        let mut messages = Vec::new();
        while let Some(frame) = rx.try_recv() {
            for line in split_frame(&frame) {
                messages.push(Message::from_json(line).unwrap());
            }
        }
        messages
    }
}
