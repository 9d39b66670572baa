//! Error types for the chat server
//!
//! Defines server-level errors, outbound delivery errors and client-side
//! errors. Uses thiserror for ergonomic error definitions.

use thiserror::Error;

use crate::codec::CodecError;
use crate::config::ConfigError;

/// Server-level errors
///
/// Bind failures are fatal to `Server::run`; everything else is local to
/// one connection and ends that connection only.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Listening socket could not be bound (fatal)
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Line framing error on a connection
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// Channel send error (fatal - registry task is gone)
    #[error("Channel send error")]
    ChannelSend,

    /// The server stopped before it finished binding
    #[error("server stopped before becoming ready")]
    NotStarted,

    /// Configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Outbound delivery errors
///
/// Occurs when handing a message to a session's outbound queue.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SendError {
    /// The session's writer has gone away
    #[error("Channel closed")]
    ChannelClosed,

    /// The session is not draining its queue fast enough
    #[error("Outbound queue full")]
    QueueFull,
}

/// Client library errors
#[derive(Debug, Error)]
pub enum ClientError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Line framing error
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// The server closed the connection
    #[error("connection closed")]
    Closed,
}
