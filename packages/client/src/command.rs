//! Parsing of typed input lines.

/// A line typed at the prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `/join <house>`
    Join(String),
    /// `/leave`: leave the current house
    Leave,
    /// `/dm <user>`: open a private house with a user (id or known name)
    Dm(String),
    /// `/room <name>`: join a room of the current house
    Room(String),
    /// `/proom <name>`: join a private room, whose joins are not announced
    PrivateRoom(String),
    Houses,
    Users,
    /// `/switch <house>`: change the house plain text goes to
    Switch(String),
    Help,
    /// Plain text for the current house (and room)
    Say(String),
    /// Unusable input, with the reason to show
    Invalid(String),
}

pub const HELP: &str = "\
Commands:
  /join <house>     join (or create) a public house
  /leave            leave the current house
  /dm <user>        open a private house with a user
  /room <name>      join a room of the current house
  /proom <name>     join a private room of the current house
  /houses           list joined houses
  /users            list known users
  /switch <house>   talk in another joined house
  /help             show this help
Anything else is sent to the current house.";

impl Command {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let Some(rest) = line.strip_prefix('/') else {
            return Self::Say(line.to_string());
        };

        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };

        match name {
            "join" => with_arg(arg, "/join <house>", Self::Join),
            "leave" => Self::Leave,
            "dm" => with_arg(arg, "/dm <user>", Self::Dm),
            "room" => with_arg(arg, "/room <name>", Self::Room),
            "proom" => with_arg(arg, "/proom <name>", Self::PrivateRoom),
            "houses" => Self::Houses,
            "users" => Self::Users,
            "switch" => with_arg(arg, "/switch <house>", Self::Switch),
            "help" => Self::Help,
            other => Self::Invalid(format!("Unknown command '/{}'. Try /help", other)),
        }
    }
}

fn with_arg(arg: &str, usage: &str, make: fn(String) -> Command) -> Command {
    if arg.is_empty() {
        Command::Invalid(format!("Usage: {}", usage))
    } else {
        make(arg.to_string())
    }
}
