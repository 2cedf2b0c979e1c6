//! Implementation for the TRANSACTION state.

use tokio::io::{AsyncRead, AsyncWrite};

use super::Client;
use super::states::Transaction;
use crate::Result;
use crate::command::Command;
use crate::parser::{parse_stat, parse_uidl_line};
use crate::types::{MessageNumber, Stat, UniqueId};

impl<S> Client<S, Transaction>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Returns the message count and total size of the maildrop.
    pub async fn stat(&mut self) -> Result<Stat> {
        let reply = self.send(&Command::Stat).await?;
        parse_stat(&reply.text)
    }

    /// Lists the unique id of every message, in server order.
    pub async fn uidl(&mut self) -> Result<Vec<(MessageNumber, UniqueId)>> {
        self.send(&Command::Uidl).await?;
        let lines = self.stream.read_multiline().await?;

        lines.iter().map(|line| parse_uidl_line(line)).collect()
    }

    /// Retrieves one message.
    ///
    /// The lines are un-stuffed and joined with CRLF; the terminator of the
    /// last line is not included.
    pub async fn retr(&mut self, number: MessageNumber) -> Result<Vec<u8>> {
        let reply = self.send(&Command::Retr(number)).await?;
        tracing::trace!(number = number.get(), info = %reply.text, "RETR");

        let lines = self.stream.read_multiline().await?;
        Ok(lines.join(&b"\r\n"[..]))
    }

    /// Sends NOOP to keep the connection alive.
    pub async fn noop(&mut self) -> Result<()> {
        self.send(&Command::Noop).await?;
        Ok(())
    }
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
    use crate::Error;
    use crate::connection::client::Authorization;
    use tokio_test::io::{Builder, Mock};

    async fn logged_in(builder: &mut Builder) -> Client<Mock, Transaction> {
        let mock = builder.build();
        let client: Client<Mock, Authorization> = Client::from_stream(mock).await.unwrap();
        client.login("u", "p").await.unwrap()
    }

    fn session() -> Builder {
        let mut builder = Builder::new();
        builder
            .read(b"+OK ready\r\n")
            .write(b"USER u\r\n")
            .read(b"+OK\r\n")
            .write(b"PASS p\r\n")
            .read(b"+OK\r\n");
        builder
    }

    #[tokio::test]
    async fn test_stat() {
        let mut builder = session();
        builder.write(b"STAT\r\n").read(b"+OK 2 320\r\n");
        let mut client = logged_in(&mut builder).await;

        let stat = client.stat().await.unwrap();
        assert_eq!(stat, Stat { count: 2, size: 320 });
    }

    #[tokio::test]
    async fn test_uidl() {
        let mut builder = session();
        builder
            .write(b"UIDL\r\n")
            .read(b"+OK\r\n1 whqtswO00WBw418f9t5JxYwZ\r\n2 QhdPYR:00WBw1Ph7x7\r\n.\r\n");
        let mut client = logged_in(&mut builder).await;

        let listing = client.uidl().await.unwrap();
        assert_eq!(listing.len(), 2);
        assert_eq!(listing[0].0.get(), 1);
        assert_eq!(listing[1].1.as_str(), "QhdPYR:00WBw1Ph7x7");
    }

    #[tokio::test]
    async fn test_retr_joins_and_unstuffs() {
        let mut builder = session();
        builder
            .write(b"RETR 1\r\n")
            .read(b"+OK 40 octets\r\nSubject: hi\r\n\r\n..dot\r\nbye\r\n.\r\n");
        let mut client = logged_in(&mut builder).await;

        let raw = client.retr(MessageNumber::new(1).unwrap()).await.unwrap();
        assert_eq!(raw, b"Subject: hi\r\n\r\n.dot\r\nbye");
    }

    #[tokio::test]
    async fn test_retr_no_such_message() {
        let mut builder = session();
        builder
            .write(b"RETR 9\r\n")
            .read(b"-ERR no such message, only 2 messages in maildrop\r\n");
        let mut client = logged_in(&mut builder).await;

        let result = client.retr(MessageNumber::new(9).unwrap()).await;
        assert!(matches!(result, Err(Error::Server { .. })));
    }

    #[tokio::test]
    async fn test_noop_and_quit() {
        let mut builder = session();
        builder
            .write(b"NOOP\r\n")
            .read(b"+OK\r\n")
            .write(b"QUIT\r\n")
            .read(b"+OK dewey POP3 server signing off\r\n");
        let mut client = logged_in(&mut builder).await;

        client.noop().await.unwrap();
        client.quit().await.unwrap();
    }
}
