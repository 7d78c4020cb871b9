//! JSON envelope exchanged between clients and the hub.
//!
//! Every frame on the WebSocket carries one or more envelopes. The server
//! coalesces envelopes queued during a single flush into one text frame,
//! separated by `\n`, so readers must split frames with [`split_frame`].
//!
//! ```json
//! {"action":"send-message","message":"hi","house":{"id":"..."},"room":null,"sender":null}
//! ```

use serde::{Deserialize, Serialize};

/// Separator between envelopes coalesced into one frame.
pub const FRAME_SEPARATOR: char = '\n';

/// Envelope action tag.
///
/// Unknown values decode to [`Action::Unknown`] and are dropped by the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Action {
    SendMessage,
    JoinHouse,
    LeaveHouse,
    JoinHousePrivate,
    UserJoin,
    UserLeft,
    HouseJoined,
    JoinRoom,
    JoinRoomPrivate,
    LeaveRoom,
    RoomJoined,
    #[default]
    #[serde(other)]
    Unknown,
}

/// Reference to a house carried inside an envelope.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HouseRef {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub private: bool,
}

/// Reference to a room carried inside an envelope.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RoomRef {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub private: bool,
}

/// Reference to a user (the sender of an envelope).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClientRef {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// The routable envelope.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WireMessage {
    #[serde(default)]
    pub action: Action,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub room: Option<RoomRef>,
    #[serde(default)]
    pub house: Option<HouseRef>,
    #[serde(default)]
    pub sender: Option<ClientRef>,
}

impl WireMessage {
    pub fn new(action: Action) -> Self {
        Self {
            action,
            ..Self::default()
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_house(mut self, house: HouseRef) -> Self {
        self.house = Some(house);
        self
    }

    pub fn with_room(mut self, room: RoomRef) -> Self {
        self.room = Some(room);
        self
    }

    pub fn with_sender(mut self, sender: ClientRef) -> Self {
        self.sender = Some(sender);
        self
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Split a (possibly coalesced) text frame into its envelopes.
pub fn split_frame(frame: &str) -> impl Iterator<Item = &str> {
    frame
        .split(FRAME_SEPARATOR)
        .map(str::trim)
        .filter(|line| !line.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_uses_kebab_case_on_the_wire() {
        // テスト項目: Action がケバブケースでシリアライズされる
        // given (前提条件):
        let msg = WireMessage::new(Action::JoinHousePrivate);

        // when (操作):
        let json = msg.to_json().unwrap();

        // then (期待する結果):
        assert!(json.contains("\"action\":\"join-house-private\""));
    }

    #[test]
    fn test_join_room_private_is_decoded() {
        // テスト項目: join-room-private が専用の Action として読み込まれる
        // given (前提条件):
        let json = r#"{"action":"join-room-private","message":"secret"}"#;

        // when (操作):
        let msg = WireMessage::from_json(json).unwrap();

        // then (期待する結果):
        assert_eq!(msg.action, Action::JoinRoomPrivate);
        assert_eq!(msg.message, "secret");
    }

    #[test]
    fn test_unknown_action_decodes_to_unknown() {
        // テスト項目: 未定義の action は Unknown としてデコードされる
        // given (前提条件):
        let json = r#"{"action":"dance","message":"hi"}"#;

        // when (操作):
        let msg = WireMessage::from_json(json).unwrap();

        // then (期待する結果):
        assert_eq!(msg.action, Action::Unknown);
        assert_eq!(msg.message, "hi");
    }

    #[test]
    fn test_partial_refs_and_unknown_fields_are_accepted() {
        // テスト項目: 部分的な参照や未知のフィールドがあってもデコードできる
        // given (前提条件): house は id のみ、sender は id なし、余分な extra フィールド
        let json = r#"{"action":"send-message","message":"yo","house":{"id":"h1"},"sender":{"name":"mallory"},"extra":42}"#;

        // when (操作):
        let msg = WireMessage::from_json(json).unwrap();

        // then (期待する結果):
        let house = msg.house.unwrap();
        assert_eq!(house.id, "h1");
        assert_eq!(house.name, "");
        assert!(!house.private);
        assert_eq!(msg.sender.unwrap().id, "");
        assert!(msg.room.is_none());
    }

    #[test]
    fn test_missing_action_is_unknown() {
        // テスト項目: action が無い場合は Unknown になる
        // given (前提条件):
        let json = r#"{"message":"no action"}"#;

        // when (操作):
        let msg = WireMessage::from_json(json).unwrap();

        // then (期待する結果):
        assert_eq!(msg.action, Action::Unknown);
    }

    #[test]
    fn test_split_frame_skips_blank_lines() {
        // テスト項目: 結合されたフレームが改行で分割され、空行は無視される
        // given (前提条件):
        let frame = "{\"action\":\"user-join\"}\n\n{\"action\":\"user-left\"}\n";

        // when (操作):
        let parts: Vec<&str> = split_frame(frame).collect();

        // then (期待する結果):
        assert_eq!(parts.len(), 2);
        assert_eq!(
            WireMessage::from_json(parts[1]).unwrap().action,
            Action::UserLeft
        );
    }
}
