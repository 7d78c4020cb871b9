//! Local view of the session: joined houses, current target, known users.
//!
//! [`ChatState`] is pure. It folds incoming envelopes with [`ChatState::apply`]
//! and turns typed commands into outgoing envelopes with [`ChatState::handle`].

use std::collections::BTreeMap;

use yakata_shared::protocol::{Action, ClientRef, HouseRef, RoomRef, WireMessage};

use crate::{
    command::{Command, HELP},
    formatter::MessageFormatter,
};

/// A house this session is a member of
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinedHouse {
    pub house: HouseRef,
    /// The other party of a private house
    pub counterpart: Option<ClientRef>,
}

impl JoinedHouse {
    /// Name shown to the user: `@bob` for private houses.
    pub fn label(&self) -> String {
        match &self.counterpart {
            Some(user) => format!("@{}", user.name),
            None => self.house.name.clone(),
        }
    }

    fn matches(&self, query: &str) -> bool {
        self.house.id == query || self.house.name == query || self.label() == query
    }
}

/// What the session should do with a typed command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Send(WireMessage),
    Print(String),
    Nothing,
}

#[derive(Debug, Clone)]
pub struct ChatState {
    username: String,
    houses: BTreeMap<String, JoinedHouse>,
    current_house: Option<String>,
    /// Room of the current house plain text goes to
    current_room: Option<RoomRef>,
    users: BTreeMap<String, String>,
    awaiting_join: bool,
}

impl ChatState {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            houses: BTreeMap::new(),
            current_house: None,
            current_room: None,
            users: BTreeMap::new(),
            awaiting_join: false,
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn current_house(&self) -> Option<&JoinedHouse> {
        self.current_house.as_ref().and_then(|id| self.houses.get(id))
    }

    pub fn current_room(&self) -> Option<&RoomRef> {
        self.current_room.as_ref()
    }

    pub fn houses(&self) -> impl Iterator<Item = &JoinedHouse> {
        self.houses.values()
    }

    /// Known users as `(id, name)`, ordered by id
    pub fn users(&self) -> impl Iterator<Item = (&str, &str)> {
        self.users.iter().map(|(id, name)| (id.as_str(), name.as_str()))
    }

    /// Label for a house reference, falling back to its name when not joined.
    pub fn house_label(&self, house: &HouseRef) -> String {
        match self.houses.get(&house.id) {
            Some(joined) => joined.label(),
            None => house.name.clone(),
        }
    }

    /// Fold an incoming envelope into the local view.
    pub fn apply(&mut self, message: &WireMessage) {
        if let Some(sender) = &message.sender {
            self.remember(sender);
        }

        match message.action {
            Action::HouseJoined => {
                let Some(house) = message.house.clone() else {
                    return;
                };
                let id = house.id.clone();
                self.houses.insert(
                    id.clone(),
                    JoinedHouse {
                        house,
                        counterpart: message.sender.clone(),
                    },
                );
                if self.awaiting_join || self.current_house.is_none() {
                    self.focus(id);
                    self.awaiting_join = false;
                }
            }
            Action::RoomJoined => {
                if let (Some(house), Some(room)) = (&message.house, &message.room) {
                    self.focus(house.id.clone());
                    self.current_room = Some(room.clone());
                }
            }
            _ => {}
        }
    }

    /// Turn a typed command into what the session should do.
    pub fn handle(&mut self, command: Command) -> Outcome {
        match command {
            Command::Join(name) => {
                self.awaiting_join = true;
                Outcome::Send(WireMessage::new(Action::JoinHouse).with_message(name))
            }
            Command::Leave => self.leave(),
            Command::Dm(target) => self.direct(&target),
            Command::Room(name) => self.join_room(Action::JoinRoom, name),
            Command::PrivateRoom(name) => self.join_room(Action::JoinRoomPrivate, name),
            Command::Houses => Outcome::Print(MessageFormatter::format_houses(self)),
            Command::Users => Outcome::Print(MessageFormatter::format_users(self)),
            Command::Switch(query) => self.switch(&query),
            Command::Help => Outcome::Print(HELP.to_string()),
            Command::Say(text) if text.is_empty() => Outcome::Nothing,
            Command::Say(text) => match self.current_house() {
                Some(joined) => {
                    let message = WireMessage::new(Action::SendMessage)
                        .with_message(text)
                        .with_house(joined.house.clone());
                    Outcome::Send(match &self.current_room {
                        Some(room) => message.with_room(room.clone()),
                        None => message,
                    })
                }
                None => not_in_house(),
            },
            Command::Invalid(reason) => Outcome::Print(reason),
        }
    }

    /// Envelopes that restore memberships on a fresh connection.
    ///
    /// The local membership is cleared; confirmations rebuild it.
    pub fn rejoin(&mut self) -> Vec<WireMessage> {
        let messages = self
            .houses
            .values()
            .map(|joined| match &joined.counterpart {
                Some(user) => WireMessage::new(Action::JoinHousePrivate).with_message(&user.id),
                None => WireMessage::new(Action::JoinHouse).with_message(&joined.house.name),
            })
            .collect();
        self.awaiting_join = self.current_house.is_some();
        self.houses.clear();
        self.current_house = None;
        self.current_room = None;
        messages
    }

    fn remember(&mut self, user: &ClientRef) {
        if !user.id.is_empty() {
            self.users.insert(user.id.clone(), user.name.clone());
        }
    }

    fn focus(&mut self, house_id: String) {
        if self.current_house.as_ref() != Some(&house_id) {
            self.current_room = None;
        }
        self.current_house = Some(house_id);
    }

    fn join_room(&self, action: Action, name: String) -> Outcome {
        match self.current_house() {
            Some(joined) => Outcome::Send(
                WireMessage::new(action)
                    .with_message(name)
                    .with_house(joined.house.clone()),
            ),
            None => not_in_house(),
        }
    }

    fn leave(&mut self) -> Outcome {
        let Some(id) = self.current_house.take() else {
            return not_in_house();
        };
        self.current_room = None;
        let Some(joined) = self.houses.remove(&id) else {
            return not_in_house();
        };
        self.current_house = self.houses.keys().next().cloned();
        Outcome::Send(WireMessage::new(Action::LeaveHouse).with_house(joined.house))
    }

    fn direct(&mut self, target: &str) -> Outcome {
        let found = self
            .users
            .get_key_value(target)
            .or_else(|| self.users.iter().find(|(_, name)| name.as_str() == target));
        match found {
            Some((_, name)) if *name == self.username => {
                Outcome::Print("You cannot open a private house with yourself".to_string())
            }
            Some((id, _)) => {
                let id = id.clone();
                self.awaiting_join = true;
                Outcome::Send(WireMessage::new(Action::JoinHousePrivate).with_message(id))
            }
            None => Outcome::Print(format!("Unknown user '{}'. Try /users", target)),
        }
    }

    fn switch(&mut self, query: &str) -> Outcome {
        let found = self
            .houses
            .values()
            .find(|joined| joined.matches(query))
            .map(|joined| (joined.house.id.clone(), joined.label()));
        match found {
            Some((id, label)) => {
                self.focus(id);
                Outcome::Print(format!("Now talking in {}", label))
            }
            None => Outcome::Print(format!("You have not joined '{}'", query)),
        }
    }
}

fn not_in_house() -> Outcome {
    Outcome::Print("Join a house first: /join <house>".to_string())
}
