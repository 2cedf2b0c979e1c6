//! Framed I/O for POP3 protocol.
//!
//! POP3 replies are CRLF-terminated status lines, optionally followed by a
//! multi-line body that ends with a lone `.` line. Lines in the body that
//! begin with `.` are byte-stuffed by the server.

#![allow(clippy::missing_errors_doc)]

use std::time::Duration;

use bytes::BytesMut;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

use super::stream::with_timeout;
use crate::command::Command;
use crate::parser::{parse_status_line, unstuff_line};
use crate::types::Reply;
use crate::{Error, Result};

/// Default buffer size for reading.
const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Maximum line length to prevent memory exhaustion.
const MAX_LINE_LENGTH: usize = 1024 * 1024; // 1 MB

/// Maximum size of one multi-line response.
const MAX_MULTILINE_SIZE: usize = 100 * 1024 * 1024; // 100 MB

/// Framed connection for POP3 protocol.
pub struct FramedStream<S> {
    reader: BufReader<S>,
    write_buffer: BytesMut,
    io_timeout: Option<Duration>,
}

impl<S> FramedStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a new framed stream without a read timeout.
    pub fn new(stream: S) -> Self {
        Self {
            reader: BufReader::with_capacity(DEFAULT_BUFFER_SIZE, stream),
            write_buffer: BytesMut::with_capacity(DEFAULT_BUFFER_SIZE),
            io_timeout: None,
        }
    }

    /// Bounds every line read by `timeout`.
    #[must_use]
    pub const fn with_io_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.io_timeout = timeout;
        self
    }

    /// Returns the read timeout.
    pub const fn io_timeout(&self) -> Option<Duration> {
        self.io_timeout
    }

    /// Reads one status line and parses it.
    pub async fn read_reply(&mut self) -> Result<Reply> {
        let line = self.read_line().await?;
        let reply = parse_status_line(&line)?;
        tracing::trace!(status = ?reply.status, text = %reply.text, "Reply");
        Ok(reply)
    }

    /// Reads the body of a multi-line response up to the `.` terminator.
    ///
    /// Returned lines have their terminator removed and are un-stuffed.
    pub async fn read_multiline(&mut self) -> Result<Vec<Vec<u8>>> {
        let mut lines = Vec::new();
        let mut total = 0;

        loop {
            let line = self.read_line().await?;
            let Some(content) = unstuff_line(&line) else {
                break;
            };

            total += content.len() + 2;
            if total > MAX_MULTILINE_SIZE {
                return Err(Error::Protocol(format!(
                    "multi-line response too large (max {MAX_MULTILINE_SIZE} bytes)"
                )));
            }
            lines.push(content.to_vec());
        }

        Ok(lines)
    }

    /// Reads a single line, including its terminator.
    ///
    /// Lines end at LF; a preceding CR is part of the terminator.
    pub async fn read_line(&mut self) -> Result<Vec<u8>> {
        match self.io_timeout {
            Some(limit) => with_timeout(limit, read_line_from(&mut self.reader)).await,
            None => read_line_from(&mut self.reader).await,
        }
    }

    /// Writes a command to the stream.
    pub async fn write_command(&mut self, command: &Command) -> Result<()> {
        tracing::debug!(command = %command, "Sending command");
        command.check_arguments()?;

        self.write_buffer.clear();
        self.write_buffer.extend_from_slice(&command.serialize());

        let stream = self.reader.get_mut();
        stream.write_all(&self.write_buffer).await?;
        stream.flush().await?;

        Ok(())
    }

    /// Gets a reference to the underlying stream.
    pub fn get_ref(&self) -> &S {
        self.reader.get_ref()
    }

    /// Consumes the framed stream and returns the inner stream.
    ///
    /// Note: Any buffered data will be lost.
    pub fn into_inner(self) -> S {
        self.reader.into_inner()
    }
}

async fn read_line_from<S>(reader: &mut BufReader<S>) -> Result<Vec<u8>>
where
    S: AsyncRead + Unpin,
{
    let mut line = Vec::new();

    loop {
        let buf = reader.fill_buf().await?;
        if buf.is_empty() {
            return Err(Error::ConnectionClosed);
        }

        if let Some(pos) = buf.iter().position(|&b| b == b'\n') {
            line.extend_from_slice(&buf[..=pos]);
            reader.consume(pos + 1);
            break;
        }

        // No LF found, consume all and continue
        let len = buf.len();
        line.extend_from_slice(buf);
        reader.consume(len);

        if line.len() > MAX_LINE_LENGTH {
            return Err(Error::Protocol("line too long".to_string()));
        }
    }

    Ok(line)
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;
    use crate::types::Status;
    use tokio_test::io::Builder;

    #[tokio::test]
    async fn test_read_reply() {
        let mock = Builder::new().read(b"+OK POP3 ready\r\n").build();
        let mut framed = FramedStream::new(mock);

        let reply = framed.read_reply().await.unwrap();
        assert_eq!(reply.status, Status::Ok);
        assert_eq!(reply.text, "POP3 ready");
    }

    #[tokio::test]
    async fn test_read_line_split_across_reads() {
        let mock = Builder::new().read(b"+OK he").read(b"llo\r\n").build();
        let mut framed = FramedStream::new(mock);

        assert_eq!(framed.read_line().await.unwrap(), b"+OK hello\r\n");
    }

    #[tokio::test]
    async fn test_read_multiline_unstuffs() {
        let mock = Builder::new()
            .read(b"Subject: dots\r\n\r\n..leading dot\r\n")
            .read(b"plain\r\n.\r\n")
            .build();
        let mut framed = FramedStream::new(mock);

        let lines = framed.read_multiline().await.unwrap();
        assert_eq!(
            lines,
            vec![
                b"Subject: dots".to_vec(),
                Vec::new(),
                b".leading dot".to_vec(),
                b"plain".to_vec(),
            ]
        );
    }

    #[tokio::test]
    async fn test_read_multiline_empty() {
        let mock = Builder::new().read(b".\r\n").build();
        let mut framed = FramedStream::new(mock);
        assert!(framed.read_multiline().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_eof_is_connection_closed() {
        let mock = Builder::new().read(b"+OK partial").build();
        let mut framed = FramedStream::new(mock);

        let result = framed.read_line().await;
        assert!(matches!(result, Err(Error::ConnectionClosed)));
    }

    #[tokio::test]
    async fn test_write_command() {
        let mock = Builder::new().write(b"UIDL\r\n").build();
        let mut framed = FramedStream::new(mock);

        framed.write_command(&Command::Uidl).await.unwrap();
    }

    #[tokio::test]
    async fn test_write_command_refuses_injected_line() {
        let mock = Builder::new().build();
        let mut framed = FramedStream::new(mock);

        let command = Command::Rpop {
            username: "alice\r\nDELE 1".to_string(),
        };
        let result = framed.write_command(&command).await;
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_read_timeout() {
        // the peer stays open but never writes
        let (client, _server) = tokio::io::duplex(64);
        let mut framed = FramedStream::new(client).with_io_timeout(Some(Duration::from_millis(20)));

        let result = framed.read_reply().await;
        assert!(matches!(result, Err(Error::Timeout(_))));
    }

    #[tokio::test]
    async fn test_line_length_limit() {
        let long_line = "A".repeat(MAX_LINE_LENGTH + 100);
        let mock = Builder::new().read(long_line.as_bytes()).build();
        let mut framed = FramedStream::new(mock);

        let result = framed.read_line().await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("line too long"));
    }
}
