//! Best-effort delivery of one message to a snapshot of recipients.

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

use crate::error::SendError;
use crate::message::ServerMessage;
use crate::types::SessionId;

/// A copied delivery handle for one session.
///
/// Holding a `Recipient` does not keep the session registered; once the
/// session is gone, delivery fails with `SendError::ChannelClosed`.
#[derive(Debug, Clone)]
pub struct Recipient {
    pub id: SessionId,
    sender: mpsc::Sender<ServerMessage>,
}

impl Recipient {
    pub fn new(id: SessionId, sender: mpsc::Sender<ServerMessage>) -> Self {
        Self { id, sender }
    }

    /// Queue `msg` without waiting for room in the queue.
    pub fn deliver(&self, msg: ServerMessage) -> Result<(), SendError> {
        self.sender.try_send(msg).map_err(|e| match e {
            TrySendError::Full(_) => SendError::QueueFull,
            TrySendError::Closed(_) => SendError::ChannelClosed,
        })
    }
}

/// Deliver `msg` to every recipient, returning how many accepted it.
///
/// A failed delivery is logged and skipped; it never stops delivery to the
/// remaining recipients. Order is unspecified.
pub fn broadcast(recipients: &[Recipient], msg: &ServerMessage) -> usize {
    let mut delivered = 0;
    for recipient in recipients {
        match recipient.deliver(msg.clone()) {
            Ok(()) => delivered += 1,
            Err(SendError::QueueFull) => {
                warn!("Dropping message for {}: outbound queue full", recipient.id);
            }
            Err(SendError::ChannelClosed) => {
                debug!("Skipping {}: connection already closed", recipient.id);
            }
        }
    }
    delivered
}
