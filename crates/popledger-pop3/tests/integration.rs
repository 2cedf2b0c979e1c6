//! Integration tests for the POP3 client.
//!
//! These tests use a mock stream to simulate POP3 server responses
//! without requiring a real server connection.

#![allow(clippy::unwrap_used)]

use std::io::{self, Cursor};
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use proptest::prelude::*;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use popledger_pop3::parser::{parse_status_line, parse_uidl_line};
use popledger_pop3::{AuthMechanism, Client, Error, ResponseCode, Status};

/// Mock stream that returns predefined responses.
struct MockStream {
    /// Responses to return (in order).
    responses: Cursor<Vec<u8>>,
    /// Captured commands sent by the client.
    sent: Arc<Mutex<Vec<u8>>>,
}

impl MockStream {
    fn new(responses: &[u8]) -> (Self, Arc<Mutex<Vec<u8>>>) {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let stream = Self {
            responses: Cursor::new(responses.to_vec()),
            sent: Arc::clone(&sent),
        };
        (stream, sent)
    }
}

impl AsyncRead for MockStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let data = self.responses.get_ref();
        let pos = usize::try_from(self.responses.position()).unwrap();

        if pos >= data.len() {
            return Poll::Ready(Ok(()));
        }

        let remaining = &data[pos..];
        let to_read = remaining.len().min(buf.remaining());
        buf.put_slice(&remaining[..to_read]);
        self.responses.set_position((pos + to_read) as u64);

        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for MockStream {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.sent.lock().unwrap().extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

fn sent_text(sent: &Arc<Mutex<Vec<u8>>>) -> String {
    String::from_utf8(sent.lock().unwrap().clone()).unwrap()
}

#[tokio::test]
async fn test_full_session() {
    let (stream, sent) = MockStream::new(
        concat!(
            "+OK POP3 server ready <1896.697170952@dbc.mtview.ca.us>\r\n",
            "+OK maildrop has 2 messages\r\n",
            "+OK 2 320\r\n",
            "+OK unique-id listing follows\r\n",
            "1 whqtswO00WBw418f9t5JxYwZ\r\n",
            "2 QhdPYR:00WBw1Ph7x7\r\n",
            ".\r\n",
            "+OK 120 octets\r\n",
            "Subject: second\r\n",
            "\r\n",
            "..begins with a dot\r\n",
            ".\r\n",
            "+OK dewey POP3 server signing off (maildrop empty)\r\n",
        )
        .as_bytes(),
    );

    let client = Client::from_stream(stream).await.unwrap();
    let mut client = client
        .authenticate(AuthMechanism::ChallengeResponse, "mrose", "tanstaaf")
        .await
        .unwrap();

    let stat = client.stat().await.unwrap();
    assert_eq!(stat.count, 2);

    let listing = client.uidl().await.unwrap();
    assert_eq!(listing.len(), 2);

    let (number, uid) = &listing[1];
    assert_eq!(uid.as_str(), "QhdPYR:00WBw1Ph7x7");
    let raw = client.retr(*number).await.unwrap();
    assert_eq!(raw, b"Subject: second\r\n\r\n.begins with a dot");

    client.quit().await.unwrap();

    assert_eq!(
        sent_text(&sent),
        concat!(
            "APOP mrose c4c9334bac560ecc979e58001b3e22fb\r\n",
            "STAT\r\n",
            "UIDL\r\n",
            "RETR 2\r\n",
            "QUIT\r\n",
        )
    );
}

#[tokio::test]
async fn test_locked_mailbox() {
    let (stream, sent) = MockStream::new(
        concat!(
            "+OK ready\r\n",
            "+OK send PASS\r\n",
            "-ERR [IN-USE] Unable to lock maildrop\r\n",
            "+OK bye\r\n",
        )
        .as_bytes(),
    );

    let client = Client::from_stream(stream).await.unwrap();
    let err = client.login("alice", "secret").await.unwrap_err();

    assert!(err.is_in_use());
    assert_eq!(err.response_code(), Some(&ResponseCode::InUse));
    assert_eq!(
        sent_text(&sent),
        "USER alice\r\nPASS secret\r\nQUIT\r\n"
    );
}

#[tokio::test]
async fn test_connection_dropped_mid_listing() {
    let (stream, _sent) = MockStream::new(
        concat!(
            "+OK ready\r\n",
            "+OK\r\n",
            "+OK\r\n",
            "+OK listing follows\r\n",
            "1 abc\r\n",
        )
        .as_bytes(),
    );

    let client = Client::from_stream(stream).await.unwrap();
    let mut client = client.login("alice", "secret").await.unwrap();

    let result = client.uidl().await;
    assert!(matches!(result, Err(Error::ConnectionClosed)));
}

#[tokio::test]
async fn test_garbage_reply_is_protocol_error() {
    let (stream, _sent) = MockStream::new(b"HTTP/1.1 400 Bad Request\r\n");
    let result = Client::from_stream(stream).await;
    assert!(matches!(result, Err(Error::Protocol(_))));
}

#[test]
fn test_parser_status_line() {
    let reply = parse_status_line(b"-ERR [LOGIN-DELAY] wait 5 minutes\r\n").unwrap();
    assert_eq!(reply.status, Status::Err);
    assert_eq!(reply.code, Some(ResponseCode::LoginDelay));
    assert_eq!(reply.text, "wait 5 minutes");
}

proptest! {
    #[test]
    fn status_parser_never_panics(line in proptest::collection::vec(any::<u8>(), 0..256)) {
        let _ = parse_status_line(&line);
    }

    #[test]
    fn uidl_line_keeps_number_and_id(number in 1u32.., uid in "[!-~]{1,70}") {
        let line = format!("{number} {uid}\r\n");
        let (parsed_number, parsed_uid) = parse_uidl_line(line.as_bytes()).unwrap();
        prop_assert_eq!(parsed_number.get(), number);
        prop_assert_eq!(parsed_uid.as_str(), uid.as_str());
    }
}
