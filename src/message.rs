//! Message protocol definitions
//!
//! Line-based protocol: clients send `VERB [argument]`, the server sends
//! `:<nick> VERB target[ :text]` and `PONG :<token>`. No numeric replies.

use std::fmt;

/// Split a line into its upper-cased verb and the untouched remainder.
///
/// The split happens at the first space. A line without a space yields an
/// empty remainder.
pub fn split_verb(line: &str) -> (String, &str) {
    match line.split_once(' ') {
        Some((verb, rest)) => (verb.to_ascii_uppercase(), rest),
        None => (line.to_ascii_uppercase(), ""),
    }
}

/// Client → Server command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Set nickname (may be empty)
    Nick(String),
    /// Set username (may be empty)
    User(String),
    /// Liveness probe, answered with PONG
    Ping(String),
    /// Join (and possibly create) a channel
    Join(String),
    /// Leave a channel
    Part(String),
    /// Message to a channel (`#` prefix) or a nickname
    PrivMsg { target: String, text: String },
    /// Close this connection
    Quit,
    /// Unknown verb or malformed argument; ignored by the server
    Unhandled { verb: String },
}

impl Command {
    /// Parse one wire line (terminator already removed).
    pub fn parse(line: &str) -> Self {
        let (verb, rest) = split_verb(line);
        match verb.as_str() {
            "NICK" => Command::Nick(rest.to_string()),
            "USER" => Command::User(rest.to_string()),
            "PING" => Command::Ping(rest.to_string()),
            "JOIN" => Command::Join(rest.to_string()),
            "PART" => Command::Part(rest.to_string()),
            "PRIVMSG" => match parse_privmsg(rest) {
                Some((target, text)) => Command::PrivMsg {
                    target: target.to_string(),
                    text: text.to_string(),
                },
                None => Command::Unhandled { verb },
            },
            "QUIT" => Command::Quit,
            _ => Command::Unhandled { verb },
        }
    }
}

/// Split a PRIVMSG argument into target and body.
///
/// The body starts after the first space; one leading `:` is dropped.
fn parse_privmsg(arg: &str) -> Option<(&str, &str)> {
    let (target, body) = arg.split_once(' ')?;
    Some((target, body.strip_prefix(':').unwrap_or(body)))
}

/// Server → Client message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// `:<nick> JOIN <channel>`
    Join { nick: String, channel: String },
    /// `:<nick> PART <channel>`
    Part { nick: String, channel: String },
    /// `:<nick> PRIVMSG <target> :<text>`
    PrivMsg {
        nick: String,
        target: String,
        text: String,
    },
    /// `PONG :<token>`
    Pong { token: String },
}

/// Wire form, without the line terminator (the codec appends `\r\n`).
impl fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerMessage::Join { nick, channel } => write!(f, ":{} JOIN {}", nick, channel),
            ServerMessage::Part { nick, channel } => write!(f, ":{} PART {}", nick, channel),
            ServerMessage::PrivMsg { nick, target, text } => {
                write!(f, ":{} PRIVMSG {} :{}", nick, target, text)
            }
            ServerMessage::Pong { token } => write!(f, "PONG :{}", token),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_verb_uppercases_verb_only() {
        let (verb, rest) = split_verb("join #Room");
        assert_eq!(verb, "JOIN");
        assert_eq!(rest, "#Room");
    }

    #[test]
    fn test_split_verb_without_space() {
        let (verb, rest) = split_verb("quit");
        assert_eq!(verb, "QUIT");
        assert_eq!(rest, "");
    }

    #[test]
    fn test_split_verb_keeps_remainder_untouched() {
        let (_, rest) = split_verb("PRIVMSG #a :two  spaces ");
        assert_eq!(rest, "#a :two  spaces ");
    }

    #[test]
    fn test_parse_basic_commands() {
        assert_eq!(Command::parse("NICK alice"), Command::Nick("alice".into()));
        assert_eq!(Command::parse("user alice"), Command::User("alice".into()));
        assert_eq!(Command::parse("PING 12345"), Command::Ping("12345".into()));
        assert_eq!(Command::parse("JOIN #room"), Command::Join("#room".into()));
        assert_eq!(Command::parse("PART #room"), Command::Part("#room".into()));
        assert_eq!(Command::parse("QUIT :bye"), Command::Quit);
    }

    #[test]
    fn test_parse_nick_without_argument_is_empty() {
        assert_eq!(Command::parse("NICK"), Command::Nick(String::new()));
    }

    #[test]
    fn test_parse_privmsg_strips_single_colon() {
        assert_eq!(
            Command::parse("PRIVMSG #room ::-) hi there"),
            Command::PrivMsg {
                target: "#room".into(),
                text: ":-) hi there".into()
            }
        );
    }

    #[test]
    fn test_parse_privmsg_without_colon() {
        assert_eq!(
            Command::parse("PRIVMSG bob hello"),
            Command::PrivMsg {
                target: "bob".into(),
                text: "hello".into()
            }
        );
    }

    #[test]
    fn test_parse_privmsg_without_text_is_unhandled() {
        assert_eq!(
            Command::parse("PRIVMSG #room"),
            Command::Unhandled {
                verb: "PRIVMSG".into()
            }
        );
    }

    #[test]
    fn test_parse_unknown_verb() {
        assert_eq!(
            Command::parse("WHO *"),
            Command::Unhandled { verb: "WHO".into() }
        );
        assert_eq!(Command::parse(""), Command::Unhandled { verb: "".into() });
    }

    #[test]
    fn test_server_message_wire_format() {
        let join = ServerMessage::Join {
            nick: "bob".into(),
            channel: "#room".into(),
        };
        assert_eq!(join.to_string(), ":bob JOIN #room");

        let part = ServerMessage::Part {
            nick: "bob".into(),
            channel: "#room".into(),
        };
        assert_eq!(part.to_string(), ":bob PART #room");

        let msg = ServerMessage::PrivMsg {
            nick: "alice".into(),
            target: "#room".into(),
            text: "hello".into(),
        };
        assert_eq!(msg.to_string(), ":alice PRIVMSG #room :hello");

        let pong = ServerMessage::Pong { token: "xyz".into() };
        assert_eq!(pong.to_string(), "PONG :xyz");
    }
}
