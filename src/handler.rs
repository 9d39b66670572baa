//! TCP connection handler
//!
//! Handles individual client connections: line framing, command parsing,
//! and the hand-off to the ChatServer actor. Cleanup runs exactly once per
//! connection, however the read loop ends.

use std::net::SocketAddr;

use futures_util::{SinkExt, StreamExt};
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, info, info_span, warn, Instrument};

use crate::codec::LineCodec;
use crate::error::ServerError;
use crate::message::{Command, ServerMessage};
use crate::server::ServerCommand;
use crate::types::SessionId;

/// Per-connection limits, taken from `ServerConfig`
#[derive(Debug, Clone, Copy)]
pub struct ConnectionLimits {
    pub max_line_length: usize,
    pub outbound_queue: usize,
}

/// Handle a new TCP connection
///
/// Registers a session, runs the read loop until EOF, error or QUIT, then
/// unregisters the session and waits for the writer to close the socket.
pub async fn handle_connection(
    stream: TcpStream,
    cmd_tx: mpsc::Sender<ServerCommand>,
    limits: ConnectionLimits,
) -> Result<(), ServerError> {
    let session_id = SessionId::new();
    let peer_addr = stream.peer_addr().ok();
    let peer = peer_addr
        .map(|a| a.to_string())
        .unwrap_or_else(|| "unknown".to_string());

    let span = info_span!("session", id = %session_id, peer = %peer);
    run_session(stream, session_id, peer_addr, cmd_tx, limits)
        .instrument(span)
        .await
}

async fn run_session(
    stream: TcpStream,
    session_id: SessionId,
    peer_addr: Option<SocketAddr>,
    cmd_tx: mpsc::Sender<ServerCommand>,
    limits: ConnectionLimits,
) -> Result<(), ServerError> {
    let (read_half, write_half) = stream.into_split();
    let mut lines = FramedRead::new(read_half, LineCodec::new(limits.max_line_length));
    let mut sink = FramedWrite::new(write_half, LineCodec::new(limits.max_line_length));

    // Channel for server -> client messages; the registry holds the sender
    let (msg_tx, mut msg_rx) = mpsc::channel::<ServerMessage>(limits.outbound_queue);

    if cmd_tx
        .send(ServerCommand::Connect {
            session_id,
            peer_addr,
            sender: msg_tx,
        })
        .await
        .is_err()
    {
        return Err(ServerError::ChannelSend);
    }
    info!("Session {} connected", session_id);

    // Write task: ends once the registry drops the session's sender
    let write_task = tokio::spawn(
        async move {
            while let Some(msg) = msg_rx.recv().await {
                if let Err(e) = sink.send(msg.to_string()).await {
                    debug!("Write failed, ending write task: {}", e);
                    break;
                }
            }
            let _ = sink.close().await;
            debug!("Write task ended");
        }
        .in_current_span(),
    );

    let outcome = read_loop(&mut lines, session_id, &cmd_tx).await;

    // Dropping the read half here releases it before the writer finishes.
    drop(lines);
    let _ = cmd_tx.send(ServerCommand::Disconnect { session_id }).await;
    let _ = write_task.await;

    info!("Session {} disconnected", session_id);
    outcome
}

/// Feed parsed lines to the actor until the connection should end
async fn read_loop(
    lines: &mut FramedRead<OwnedReadHalf, LineCodec>,
    session_id: SessionId,
    cmd_tx: &mpsc::Sender<ServerCommand>,
) -> Result<(), ServerError> {
    while let Some(line) = lines.next().await {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("Read error: {}", e);
                return Err(e.into());
            }
        };

        match Command::parse(&line) {
            Command::Quit => {
                debug!("QUIT received");
                return Ok(());
            }
            Command::Unhandled { verb } => {
                debug!("Ignoring {:?}", verb);
            }
            command => {
                let Some(cmd) = command_to_server_command(session_id, command) else {
                    continue;
                };
                if cmd_tx.send(cmd).await.is_err() {
                    debug!("Server closed, ending read loop");
                    return Err(ServerError::ChannelSend);
                }
            }
        }
    }
    debug!("EOF");
    Ok(())
}

/// Convert a parsed Command to a ServerCommand
///
/// QUIT and unhandled lines never reach the actor.
fn command_to_server_command(session_id: SessionId, command: Command) -> Option<ServerCommand> {
    let cmd = match command {
        Command::Nick(nickname) => ServerCommand::SetNickname {
            session_id,
            nickname,
        },
        Command::User(username) => ServerCommand::SetUsername {
            session_id,
            username,
        },
        Command::Ping(token) => ServerCommand::Ping { session_id, token },
        Command::Join(channel) => ServerCommand::Join {
            session_id,
            channel,
        },
        Command::Part(channel) => ServerCommand::Part {
            session_id,
            channel,
        },
        Command::PrivMsg { target, text } => ServerCommand::PrivMsg {
            session_id,
            target,
            text,
        },
        Command::Quit | Command::Unhandled { .. } => return None,
    };
    Some(cmd)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_conversion() {
        let id = SessionId::new();

        match command_to_server_command(id, Command::Join("#room".into())) {
            Some(ServerCommand::Join {
                session_id,
                channel,
            }) => {
                assert_eq!(session_id, id);
                assert_eq!(channel, "#room");
            }
            other => panic!("Wrong command: {:?}", other),
        }

        match command_to_server_command(
            id,
            Command::PrivMsg {
                target: "bob".into(),
                text: "hi".into(),
            },
        ) {
            Some(ServerCommand::PrivMsg { target, text, .. }) => {
                assert_eq!(target, "bob");
                assert_eq!(text, "hi");
            }
            other => panic!("Wrong command: {:?}", other),
        }
    }

    #[test]
    fn test_quit_and_unhandled_are_not_forwarded() {
        let id = SessionId::new();
        assert!(command_to_server_command(id, Command::Quit).is_none());
        assert!(command_to_server_command(
            id,
            Command::Unhandled {
                verb: "WHO".into()
            }
        )
        .is_none());
    }
}
