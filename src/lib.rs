//! Minimal IRC-style Chat Server Library
//!
//! A line-based chat server built on tokio, using the Actor pattern for
//! registry state.
//!
//! # Features
//! - NICK / USER identity
//! - JOIN / PART channels (created on first join, deleted when empty)
//! - PRIVMSG to channels or nicknames
//! - PING / PONG
//! - QUIT and disconnect cleanup
//!
//! # Architecture
//! - `ChatServer` is the actor owning the `Registry` of sessions and channels
//! - Each connection has a `handler` task that parses lines into commands
//!   and a writer task draining the session's outbound queue
//! - Notifications go to a recipient snapshot taken during the registry edit
//!
//! # Example
//! ```ignore
//! use irc_lite::{Server, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let server = Server::new(ServerConfig::with_addr("127.0.0.1:0"));
//!     let handle = server.handle();
//!     tokio::spawn(server.run());
//!
//!     let addr = handle.ready().await.unwrap();
//!     println!("listening on {}", addr);
//! }
//! ```

pub mod broadcast;
pub mod channel;
pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod handler;
pub mod listener;
pub mod message;
pub mod registry;
pub mod server;
pub mod session;
pub mod types;

// Re-export main types for convenience
pub use channel::Channel;
pub use client::Client;
pub use config::ServerConfig;
pub use error::{ClientError, SendError, ServerError};
pub use handler::handle_connection;
pub use listener::{Server, ServerHandle};
pub use message::{Command, ServerMessage};
pub use registry::{Registry, RegistrySnapshot};
pub use server::{ChatServer, ServerCommand};
pub use session::Session;
pub use types::SessionId;
