//! Session struct definition
//!
//! Represents one connected client: its identity, joined channels and the
//! outbound queue feeding its connection's writer task.

use std::collections::HashSet;
use std::net::SocketAddr;

use tokio::sync::mpsc;

use crate::broadcast::Recipient;
use crate::error::SendError;
use crate::message::ServerMessage;
use crate::types::SessionId;

/// Connected client state
///
/// The joined-channel set is only edited by the registry, together with the
/// matching channel's member set.
#[derive(Debug)]
pub struct Session {
    /// Unique identifier for this connection
    pub id: SessionId,
    /// Remote address, when known
    pub peer_addr: Option<SocketAddr>,
    /// Nickname (empty until NICK)
    pub nickname: String,
    /// Username (empty until USER)
    pub username: String,
    /// Names of joined channels
    pub(crate) channels: HashSet<String>,
    /// Registry clock value of the last NICK; higher wins nickname routing
    pub(crate) nick_claim: u64,
    /// Server → Client message queue
    sender: mpsc::Sender<ServerMessage>,
}

impl Session {
    /// Create a new session with the given ID and outbound queue
    pub fn new(
        id: SessionId,
        peer_addr: Option<SocketAddr>,
        sender: mpsc::Sender<ServerMessage>,
    ) -> Self {
        Self {
            id,
            peer_addr,
            nickname: String::new(),
            username: String::new(),
            channels: HashSet::new(),
            nick_claim: 0,
            sender,
        }
    }

    /// Queue a message for this session without waiting
    pub fn send(&self, msg: ServerMessage) -> Result<(), SendError> {
        self.recipient().deliver(msg)
    }

    /// Delivery handle that outlives a registry borrow
    pub fn recipient(&self) -> Recipient {
        Recipient::new(self.id, self.sender.clone())
    }

    /// Nickname for log lines
    pub fn display_name(&self) -> &str {
        if self.nickname.is_empty() {
            "*"
        } else {
            &self.nickname
        }
    }

    /// Check if this session has joined `channel`
    pub fn is_in(&self, channel: &str) -> bool {
        self.channels.contains(channel)
    }

    /// Joined channel names, in no particular order
    pub fn channels(&self) -> impl Iterator<Item = &str> {
        self.channels.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_session_creation() {
        let (tx, _rx) = mpsc::channel(32);
        let session = Session::new(SessionId::new(), None, tx);

        assert!(session.nickname.is_empty());
        assert!(session.username.is_empty());
        assert_eq!(session.display_name(), "*");
        assert_eq!(session.channels().count(), 0);
    }

    #[tokio::test]
    async fn test_session_send_reaches_queue() {
        let (tx, mut rx) = mpsc::channel(32);
        let session = Session::new(SessionId::new(), None, tx);

        session
            .send(ServerMessage::Pong {
                token: "t".to_string(),
            })
            .unwrap();

        assert_eq!(
            rx.recv().await,
            Some(ServerMessage::Pong {
                token: "t".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_session_send_after_writer_gone() {
        let (tx, rx) = mpsc::channel(32);
        let session = Session::new(SessionId::new(), None, tx);
        drop(rx);

        let result = session.send(ServerMessage::Pong {
            token: "t".to_string(),
        });
        assert_eq!(result, Err(SendError::ChannelClosed));
    }
}
