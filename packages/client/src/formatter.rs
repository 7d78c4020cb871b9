//! Message formatting utilities for client display.

use yakata_shared::{
    protocol::{Action, WireMessage},
    time::format_clock_time,
};

use crate::state::ChatState;

/// Message formatter for client display
pub struct MessageFormatter;

impl MessageFormatter {
    /// Format an incoming envelope, or `None` when it has nothing to show.
    ///
    /// Server-wide `user-join` snapshots are silent; `/users` lists them.
    pub fn format_incoming(
        message: &WireMessage,
        state: &ChatState,
        received_at: i64,
    ) -> Option<String> {
        let time = format_clock_time(received_at);
        let scope = Self::scope(message, state);
        let sender = message.sender.as_ref().map(|s| s.name.as_str()).unwrap_or("?");

        let line = match message.action {
            Action::SendMessage => format!("[{}] {} {}: {}", time, scope?, sender, message.message),
            Action::UserJoin => format!("[{}] {} + {}", time, scope?, message.message),
            Action::UserLeft => match scope {
                Some(scope) => format!("[{}] {} - {} left", time, scope, sender),
                None => format!("[{}] - {} went offline", time, sender),
            },
            Action::HouseJoined => {
                let house = message.house.as_ref()?;
                if house.private {
                    format!("[{}] Private house with @{} is open", time, sender)
                } else {
                    format!("[{}] Joined house {}", time, house.name)
                }
            }
            Action::RoomJoined => format!("[{}] Joined {}", time, scope?),
            Action::JoinHousePrivate => {
                format!("[{}] @{} started a private conversation with you", time, sender)
            }
            _ => return None,
        };
        Some(format!("\n{}\n", line))
    }

    /// `[house]` or `[house/room]`
    fn scope(message: &WireMessage, state: &ChatState) -> Option<String> {
        let house = state.house_label(message.house.as_ref()?);
        Some(match &message.room {
            Some(room) => format!("[{}/{}]", house, room.name),
            None => format!("[{}]", house),
        })
    }

    /// Joined houses, current one marked with `*`
    pub fn format_houses(state: &ChatState) -> String {
        let current = state.current_house().map(|joined| joined.house.id.as_str());
        let mut output = String::from("Houses:\n");
        let mut any = false;
        for joined in state.houses() {
            any = true;
            let marker = if Some(joined.house.id.as_str()) == current {
                "*"
            } else {
                " "
            };
            output.push_str(&format!("{} {}", marker, joined.label()));
            if Some(joined.house.id.as_str()) == current
                && let Some(room) = state.current_room()
            {
                output.push_str(&format!(" (room {})", room.name));
            }
            output.push('\n');
        }
        if !any {
            output.push_str("(none)\n");
        }
        output
    }

    /// Known users, the current user marked with `(me)`
    pub fn format_users(state: &ChatState) -> String {
        let mut output = String::from("Users:\n");
        let mut any = false;
        for (id, name) in state.users() {
            any = true;
            let me_suffix = if name == state.username() { " (me)" } else { "" };
            output.push_str(&format!("{}{} [{}]\n", name, me_suffix, id));
        }
        if !any {
            output.push_str("(No users)\n");
        }
        output
    }

    pub fn format_binary_message(byte_count: usize) -> String {
        format!("\n← Received {} bytes of binary data\n", byte_count)
    }

    /// Format a raw text message (when parsing fails)
    pub fn format_raw_message(text: &str) -> String {
        format!("\n← Received: {}\n", text)
    }
}
