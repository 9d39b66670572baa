//! TCP acceptor
//!
//! `Server::run` binds, announces readiness, and spawns one handler task per
//! accepted connection. A `ServerHandle` observes readiness, stops the
//! accept loop and queries registry state.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::handler::{handle_connection, ConnectionLimits};
use crate::registry::RegistrySnapshot;
use crate::server::{ChatServer, ServerCommand};

/// Pause after a failed accept, e.g. while the process is out of descriptors
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// A chat server that has not started listening yet
pub struct Server {
    config: ServerConfig,
    cmd_tx: mpsc::Sender<ServerCommand>,
    cmd_rx: mpsc::Receiver<ServerCommand>,
    ready_tx: watch::Sender<Option<SocketAddr>>,
    ready_rx: watch::Receiver<Option<SocketAddr>>,
    shutdown: CancellationToken,
}

impl Server {
    pub fn new(config: ServerConfig) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(config.command_queue);
        let (ready_tx, ready_rx) = watch::channel(None);
        Self {
            config,
            cmd_tx,
            cmd_rx,
            ready_tx,
            ready_rx,
            shutdown: CancellationToken::new(),
        }
    }

    /// Handle for readiness, shutdown and inspection; may be taken before `run`.
    pub fn handle(&self) -> ServerHandle {
        ServerHandle {
            ready: self.ready_rx.clone(),
            shutdown: self.shutdown.clone(),
            cmd_tx: self.cmd_tx.clone(),
        }
    }

    /// Bind, signal readiness, then accept connections until closed.
    ///
    /// Returns `Ok(())` after `ServerHandle::close`. Connections accepted
    /// before that keep running until their clients leave.
    pub async fn run(self) -> Result<(), ServerError> {
        let Server {
            config,
            cmd_tx,
            cmd_rx,
            ready_tx,
            ready_rx: _,
            shutdown,
        } = self;

        let listener = match TcpListener::bind(&config.listen_addr).await {
            Ok(listener) => listener,
            Err(source) => {
                error!("Failed to bind {}: {}", config.listen_addr, source);
                return Err(ServerError::Bind {
                    addr: config.listen_addr,
                    source,
                });
            }
        };
        let local_addr = listener.local_addr()?;

        tokio::spawn(ChatServer::new(cmd_rx).run());

        ready_tx.send_replace(Some(local_addr));
        info!("Chat server listening on {}", local_addr);

        let limits = ConnectionLimits {
            max_line_length: config.max_line_length,
            outbound_queue: config.outbound_queue,
        };

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    info!("Listener on {} closed", local_addr);
                    return Ok(());
                }
                accepted = listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        debug!("New connection from {}", addr);
                        let cmd_tx = cmd_tx.clone();
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(stream, cmd_tx, limits).await {
                                warn!("Connection {} ended with error: {}", addr, e);
                            }
                        });
                    }
                    Err(e) => {
                        error!("Failed to accept connection: {}", e);
                        pause_after_accept_error(&shutdown).await;
                    }
                },
            }
        }
    }
}

/// Cloneable control handle for a `Server`
#[derive(Clone)]
pub struct ServerHandle {
    ready: watch::Receiver<Option<SocketAddr>>,
    shutdown: CancellationToken,
    cmd_tx: mpsc::Sender<ServerCommand>,
}

impl ServerHandle {
    /// Wait until the server is bound and return its address.
    ///
    /// Fails with `ServerError::NotStarted` if the server stopped first.
    pub async fn ready(&self) -> Result<SocketAddr, ServerError> {
        let mut ready = self.ready.clone();
        let addr = *ready
            .wait_for(Option::is_some)
            .await
            .map_err(|_| ServerError::NotStarted)?;
        addr.ok_or(ServerError::NotStarted)
    }

    /// Bound address, if the server is ready
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.ready.borrow()
    }

    /// Stop accepting connections
    pub fn close(&self) {
        self.shutdown.cancel();
    }

    /// Whether `close` has been called
    pub fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Copy of the current registry state
    pub async fn snapshot(&self) -> Result<RegistrySnapshot, ServerError> {
        let (reply, rx) = oneshot::channel();
        self.cmd_tx
            .send(ServerCommand::Snapshot { reply })
            .await
            .map_err(|_| ServerError::ChannelSend)?;
        rx.await.map_err(|_| ServerError::ChannelSend)
    }
}

/// Wait out `ACCEPT_RETRY_DELAY`, returning early if the listener is closed
async fn pause_after_accept_error(shutdown: &CancellationToken) {
    tokio::select! {
        _ = shutdown.cancelled() => {}
        _ = tokio::time::sleep(ACCEPT_RETRY_DELAY) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_accept_error_pause_waits_retry_delay() {
        let shutdown = CancellationToken::new();
        let start = std::time::Instant::now();
        pause_after_accept_error(&shutdown).await;
        assert!(start.elapsed() >= ACCEPT_RETRY_DELAY);
    }

    #[tokio::test]
    async fn test_accept_error_pause_ends_on_close() {
        let shutdown = CancellationToken::new();
        shutdown.cancel();
        tokio::time::timeout(Duration::from_millis(50), pause_after_accept_error(&shutdown))
            .await
            .expect("pause ignored cancellation");
    }

    #[tokio::test]
    async fn test_ready_reports_ephemeral_port() {
        let server = Server::new(ServerConfig::with_addr("127.0.0.1:0"));
        let handle = server.handle();
        assert!(handle.local_addr().is_none());

        let task = tokio::spawn(server.run());
        let addr = handle.ready().await.unwrap();

        assert_ne!(addr.port(), 0);
        assert_eq!(handle.local_addr(), Some(addr));

        handle.close();
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_bind_failure_is_reported() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = taken.local_addr().unwrap();

        let server = Server::new(ServerConfig::with_addr(addr.to_string()));
        let handle = server.handle();

        let result = server.run().await;
        assert!(matches!(result, Err(ServerError::Bind { .. })));
        assert!(matches!(handle.ready().await, Err(ServerError::NotStarted)));
    }

    #[tokio::test]
    async fn test_close_before_accepting_returns_ok() {
        let server = Server::new(ServerConfig::with_addr("127.0.0.1:0"));
        let handle = server.handle();
        handle.close();

        assert!(handle.is_closed());
        server.run().await.unwrap();
    }
}
