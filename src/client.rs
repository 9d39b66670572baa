//! Client library
//!
//! A thin line-oriented client for the chat server, used by tests and by
//! interactive front ends.

use futures_util::{SinkExt, StreamExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio_util::codec::{FramedRead, FramedWrite};

use crate::codec::LineCodec;
use crate::error::ClientError;

/// A connected client
pub struct Client {
    reader: FramedRead<OwnedReadHalf, LineCodec>,
    writer: FramedWrite<OwnedWriteHalf, LineCodec>,
}

impl Client {
    /// Connect to a server
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr).await?;
        let (read_half, write_half) = stream.into_split();
        Ok(Self {
            // Relayed lines carry a prefix, so they can exceed the server's input limit.
            reader: FramedRead::new(read_half, LineCodec::unbounded()),
            writer: FramedWrite::new(write_half, LineCodec::default()),
        })
    }

    /// Send NICK then USER with the same name
    pub async fn login(&mut self, name: &str) -> Result<(), ClientError> {
        self.nick(name).await?;
        self.user(name).await
    }

    pub async fn nick(&mut self, name: &str) -> Result<(), ClientError> {
        self.send_line(format!("NICK {}", name)).await
    }

    pub async fn user(&mut self, name: &str) -> Result<(), ClientError> {
        self.send_line(format!("USER {}", name)).await
    }

    pub async fn join(&mut self, channel: &str) -> Result<(), ClientError> {
        self.send_line(format!("JOIN {}", channel)).await
    }

    pub async fn part(&mut self, channel: &str) -> Result<(), ClientError> {
        self.send_line(format!("PART {}", channel)).await
    }

    /// Send a PRIVMSG to a channel or nickname
    pub async fn msg(&mut self, target: &str, text: &str) -> Result<(), ClientError> {
        self.send_line(format!("PRIVMSG {} :{}", target, text)).await
    }

    pub async fn ping(&mut self, token: &str) -> Result<(), ClientError> {
        self.send_line(format!("PING {}", token)).await
    }

    /// Ask the server to close this connection
    pub async fn quit(&mut self) -> Result<(), ClientError> {
        self.send_line("QUIT".to_string()).await
    }

    /// Send a raw protocol line (terminator added)
    pub async fn send_line(&mut self, line: String) -> Result<(), ClientError> {
        self.writer.send(line).await?;
        Ok(())
    }

    /// Read the next line from the server, without its terminator
    ///
    /// Returns `ClientError::Closed` once the server has closed the connection.
    pub async fn read_line(&mut self) -> Result<String, ClientError> {
        match self.reader.next().await {
            Some(line) => Ok(line?),
            None => Err(ClientError::Closed),
        }
    }

    /// Close the connection
    pub async fn close(mut self) -> Result<(), ClientError> {
        self.writer.close().await?;
        Ok(())
    }
}
