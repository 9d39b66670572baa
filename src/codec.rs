//! Line codec: frames a TCP byte stream into protocol lines.
//!
//! Lines end at `\n`; one trailing `\r` is stripped so both `\r\n` and bare
//! `\n` terminators are accepted. Outgoing lines are written with `\r\n`.

use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

/// Codec error: an oversized line or an I/O failure.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("line exceeds maximum length ({max} bytes)")]
    LineTooLong { max: usize },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A tokio codec that frames text lines on `\n` boundaries.
#[derive(Debug, Clone)]
pub struct LineCodec {
    max_length: usize,
    // Bytes already scanned for a newline without finding one.
    next_index: usize,
}

impl LineCodec {
    /// Create a codec rejecting lines longer than `max_length` bytes.
    pub fn new(max_length: usize) -> Self {
        Self {
            max_length,
            next_index: 0,
        }
    }

    /// Create a codec that accepts lines of any length.
    pub fn unbounded() -> Self {
        Self::new(usize::MAX)
    }

    fn finish_line(&self, mut raw: BytesMut) -> Result<String, CodecError> {
        if raw.last() == Some(&b'\r') {
            raw.truncate(raw.len() - 1);
        }
        if raw.len() > self.max_length {
            return Err(CodecError::LineTooLong {
                max: self.max_length,
            });
        }
        Ok(String::from_utf8_lossy(&raw).into_owned())
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new(8191)
    }
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let start = self.next_index.min(src.len());
        match src[start..].iter().position(|b| *b == b'\n') {
            Some(offset) => {
                let newline = start + offset;
                self.next_index = 0;
                let mut raw = src.split_to(newline + 1);
                raw.truncate(newline);
                self.finish_line(raw).map(Some)
            }
            None => {
                // +1 leaves room for a '\r' whose '\n' has not arrived yet.
                if src.len() > self.max_length.saturating_add(1) {
                    return Err(CodecError::LineTooLong {
                        max: self.max_length,
                    });
                }
                self.next_index = src.len();
                Ok(None)
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(line) = self.decode(src)? {
            return Ok(Some(line));
        }
        if src.is_empty() {
            return Ok(None);
        }
        // Peer closed mid-line: hand over what it sent.
        self.next_index = 0;
        let raw = src.split_to(src.len());
        self.finish_line(raw).map(Some)
    }
}

impl Encoder<String> for LineCodec {
    type Error = CodecError;

    fn encode(&mut self, item: String, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(item.len() + 2);
        dst.put_slice(item.as_bytes());
        dst.put_slice(b"\r\n");
        Ok(())
    }
}
