//! ChatServer Actor implementation
//!
//! The central actor that owns the [`Registry`] and dispatches commands from
//! connection handlers. Because one task applies every command in turn, each
//! command is a single uninterrupted registry edit, and the recipient
//! snapshot it produces is taken inside that edit.
//!
//! The actor never waits on a socket: deliveries go into per-session
//! outbound queues drained by each connection's writer task.

use std::net::SocketAddr;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::broadcast::broadcast;
use crate::message::ServerMessage;
use crate::registry::{Registry, RegistrySnapshot};
use crate::session::Session;
use crate::types::{is_channel_name, SessionId};

/// Commands sent from handlers to the ChatServer actor
#[derive(Debug)]
pub enum ServerCommand {
    /// New connection accepted
    Connect {
        session_id: SessionId,
        peer_addr: Option<SocketAddr>,
        sender: mpsc::Sender<ServerMessage>,
    },
    /// Connection ended (EOF, error or QUIT)
    Disconnect { session_id: SessionId },
    /// NICK
    SetNickname {
        session_id: SessionId,
        nickname: String,
    },
    /// USER
    SetUsername {
        session_id: SessionId,
        username: String,
    },
    /// PING
    Ping { session_id: SessionId, token: String },
    /// JOIN
    Join {
        session_id: SessionId,
        channel: String,
    },
    /// PART
    Part {
        session_id: SessionId,
        channel: String,
    },
    /// PRIVMSG
    PrivMsg {
        session_id: SessionId,
        target: String,
        text: String,
    },
    /// Copy out the registry state
    Snapshot {
        reply: oneshot::Sender<RegistrySnapshot>,
    },
}

/// The main ChatServer actor
pub struct ChatServer {
    registry: Registry,
    /// Command receiver channel
    receiver: mpsc::Receiver<ServerCommand>,
}

impl ChatServer {
    /// Create a new ChatServer with the given command receiver
    pub fn new(receiver: mpsc::Receiver<ServerCommand>) -> Self {
        Self {
            registry: Registry::new(),
            receiver,
        }
    }

    /// Run the ChatServer event loop
    ///
    /// Continuously receives and processes commands until all senders are dropped.
    pub async fn run(mut self) {
        info!("ChatServer started");

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd);
        }

        info!("ChatServer shutting down");
    }

    /// Process a single command
    fn handle_command(&mut self, cmd: ServerCommand) {
        match cmd {
            ServerCommand::Connect {
                session_id,
                peer_addr,
                sender,
            } => self.handle_connect(session_id, peer_addr, sender),
            ServerCommand::Disconnect { session_id } => self.handle_disconnect(session_id),
            ServerCommand::SetNickname {
                session_id,
                nickname,
            } => {
                debug!("Session {} set nickname to '{}'", session_id, nickname);
                self.registry.set_nickname(session_id, nickname);
            }
            ServerCommand::SetUsername {
                session_id,
                username,
            } => {
                debug!("Session {} set username to '{}'", session_id, username);
                self.registry.set_username(session_id, username);
            }
            ServerCommand::Ping { session_id, token } => self.handle_ping(session_id, token),
            ServerCommand::Join {
                session_id,
                channel,
            } => self.handle_join(session_id, channel),
            ServerCommand::Part {
                session_id,
                channel,
            } => self.handle_part(session_id, channel),
            ServerCommand::PrivMsg {
                session_id,
                target,
                text,
            } => self.handle_privmsg(session_id, target, text),
            ServerCommand::Snapshot { reply } => {
                let _ = reply.send(self.registry.snapshot());
            }
        }
    }

    fn handle_connect(
        &mut self,
        session_id: SessionId,
        peer_addr: Option<SocketAddr>,
        sender: mpsc::Sender<ServerMessage>,
    ) {
        if !self
            .registry
            .register(Session::new(session_id, peer_addr, sender))
        {
            debug!("Session {} already registered", session_id);
            return;
        }
        debug!(
            "Total sessions: {}, Total channels: {}",
            self.registry.session_count(),
            self.registry.channel_count()
        );
    }

    /// Remove the session everywhere, then tell remaining members it parted
    fn handle_disconnect(&mut self, session_id: SessionId) {
        let Some(departure) = self.registry.unregister(session_id) else {
            return;
        };
        let name = departure.session.display_name().to_string();
        match departure.session.peer_addr {
            Some(addr) => info!("{} ({}) disconnected", name, addr),
            None => info!("{} disconnected", name),
        }
        let nick = departure.session.nickname;

        for (channel, remaining) in departure.parted {
            info!("{} left {}", name, channel);
            let notice = ServerMessage::Part {
                nick: nick.clone(),
                channel,
            };
            broadcast(&remaining, &notice);
        }

        debug!(
            "Total sessions: {}, Total channels: {}",
            self.registry.session_count(),
            self.registry.channel_count()
        );
    }

    fn handle_ping(&self, session_id: SessionId, token: String) {
        let Some(session) = self.registry.session(session_id) else {
            return;
        };
        if let Err(e) = session.send(ServerMessage::Pong { token }) {
            debug!("PONG to {} not delivered: {}", session_id, e);
        }
    }

    fn handle_join(&mut self, session_id: SessionId, channel: String) {
        if channel.is_empty() {
            return;
        }
        let Some(members) = self.registry.join(session_id, &channel) else {
            return;
        };
        info!("{} joined {}", self.display_name_of(session_id), channel);
        let nick = self.nickname_of(session_id);

        broadcast(&members, &ServerMessage::Join { nick, channel });
    }

    fn handle_part(&mut self, session_id: SessionId, channel: String) {
        let Some(members) = self.registry.part(session_id, &channel) else {
            return;
        };
        info!("{} left {}", self.display_name_of(session_id), channel);
        let nick = self.nickname_of(session_id);

        broadcast(&members, &ServerMessage::Part { nick, channel });
    }

    fn handle_privmsg(&self, session_id: SessionId, target: String, text: String) {
        if self.registry.session(session_id).is_none() {
            return;
        }
        let recipients = if is_channel_name(&target) {
            self.registry.recipients_of(&target)
        } else {
            self.registry.find_by_nickname(&target).into_iter().collect()
        };
        if recipients.is_empty() {
            debug!("PRIVMSG to {} has no recipients", target);
            return;
        }

        let msg = ServerMessage::PrivMsg {
            nick: self.nickname_of(session_id),
            target,
            text,
        };
        broadcast(&recipients, &msg);
    }

    fn nickname_of(&self, session_id: SessionId) -> String {
        self.registry
            .session(session_id)
            .map(|s| s.nickname.clone())
            .unwrap_or_default()
    }

    fn display_name_of(&self, session_id: SessionId) -> &str {
        self.registry
            .session(session_id)
            .map_or("*", |s| s.display_name())
    }
}
