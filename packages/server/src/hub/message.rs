//! Hub-side helpers around the wire envelope.

use std::sync::Arc;

pub use yakata_shared::protocol::{Action, ClientRef, HouseRef, RoomRef, WireMessage as Message};
use yakata_shared::protocol::FRAME_SEPARATOR;

use super::outbound::OutboundFrame;
use crate::domain::User;

/// Encode a message once so it can be shared by every recipient.
///
/// Encoding failures are logged and yield `None`; the message is not delivered.
pub fn encode(message: &Message) -> Option<OutboundFrame> {
    match message.to_json() {
        Ok(json) => Some(Arc::from(json)),
        Err(e) => {
            tracing::error!("Failed to encode {:?} message: {}", message.action, e);
            None
        }
    }
}

/// Encode several messages into one frame, separated by [`FRAME_SEPARATOR`].
///
/// Messages that fail to encode are skipped; `None` when nothing remains.
pub fn encode_batch<'a>(messages: impl IntoIterator<Item = &'a Message>) -> Option<OutboundFrame> {
    let mut text = String::new();
    for message in messages {
        let Some(frame) = encode(message) else {
            continue;
        };
        if !text.is_empty() {
            text.push(FRAME_SEPARATOR);
        }
        text.push_str(&frame);
    }
    (!text.is_empty()).then(|| Arc::from(text))
}

pub fn client_ref(user: &User) -> ClientRef {
    ClientRef {
        id: user.id.to_string(),
        name: user.name.clone(),
    }
}

/// Server-wide presence: `user` is known to the hub
pub fn user_join(user: &User) -> Message {
    Message::new(Action::UserJoin).with_sender(client_ref(user))
}

/// Server-wide presence: `user` went away (only relayed from other instances)
pub fn user_left(user: &User) -> Message {
    Message::new(Action::UserLeft).with_sender(client_ref(user))
}

/// Sent to existing house members when `joiner` joins
pub fn welcome_to_house(house: HouseRef, joiner: &User) -> Message {
    Message::new(Action::UserJoin)
        .with_message(format!("{} joined the house", joiner.name))
        .with_house(house)
        .with_sender(client_ref(joiner))
}

/// Sent to existing room members when `joiner` joins a public room
pub fn welcome_to_room(house: HouseRef, room: RoomRef, joiner: &User) -> Message {
    Message::new(Action::UserJoin)
        .with_message(format!("{} joined the room", joiner.name))
        .with_house(house)
        .with_room(room)
        .with_sender(client_ref(joiner))
}

/// Join confirmation. For private houses `counterpart` is the other party.
pub fn house_joined(house: HouseRef, counterpart: Option<&User>) -> Message {
    let message = Message::new(Action::HouseJoined).with_house(house);
    match counterpart {
        Some(user) => message.with_sender(client_ref(user)),
        None => message,
    }
}

pub fn room_joined(house: HouseRef, room: RoomRef) -> Message {
    Message::new(Action::RoomJoined)
        .with_house(house)
        .with_room(room)
}

/// Invitation delivered to the target of a private join
pub fn invite(house: HouseRef, inviter: &User, target: &User) -> Message {
    Message::new(Action::JoinHousePrivate)
        .with_message(target.id.to_string())
        .with_house(house)
        .with_sender(client_ref(inviter))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UserId;

    #[test]
    fn test_welcome_to_house_names_the_joiner() {
        // テスト項目: ハウス参加通知に参加者名・ハウス参照・送信者が含まれる
        // given (前提条件):
        let alice = User::new(UserId::generate(), "alice");
        let house = HouseRef {
            id: "h1".into(),
            name: "general".into(),
            private: false,
        };

        // when (操作):
        let message = welcome_to_house(house.clone(), &alice);

        // then (期待する結果):
        assert_eq!(message.action, Action::UserJoin);
        assert_eq!(message.message, "alice joined the house");
        assert_eq!(message.house, Some(house));
        assert_eq!(message.sender, Some(client_ref(&alice)));
    }

    #[test]
    fn test_public_house_joined_has_no_sender() {
        // テスト項目: 公開ハウスの参加確認には送信者が含まれない
        // given (前提条件):
        let house = HouseRef::default();

        // when (操作):
        let message = house_joined(house, None);

        // then (期待する結果):
        assert_eq!(message.action, Action::HouseJoined);
        assert!(message.sender.is_none());
    }

    #[test]
    fn test_encode_produces_single_line_json() {
        // テスト項目: エンコード結果は改行を含まない 1 行の JSON になる
        // given (前提条件):
        let message = Message::new(Action::SendMessage).with_message("line1\nline2");

        // when (操作):
        let frame = encode(&message).unwrap();

        // then (期待する結果):
        assert!(!frame.contains('\n'));
        assert_eq!(Message::from_json(&frame).unwrap(), message);
    }
}
