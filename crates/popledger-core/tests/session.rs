//! Session lifecycle tests against a scripted server.

#![allow(clippy::unwrap_used)]

use std::io::{self, Cursor};
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use popledger_core::{AccountConfig, AuthMechanism, Error, KnownUids, MailboxSession, Payload};

/// Mock stream that replays a server script and records what the client sent.
struct MockStream {
    responses: Cursor<Vec<u8>>,
    sent: Arc<Mutex<Vec<u8>>>,
}

impl MockStream {
    fn new(responses: &str) -> (Self, Arc<Mutex<Vec<u8>>>) {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let stream = Self {
            responses: Cursor::new(responses.as_bytes().to_vec()),
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

fn sent_lines(sent: &Arc<Mutex<Vec<u8>>>) -> Vec<String> {
    String::from_utf8(sent.lock().unwrap().clone())
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

const TWO_MESSAGES: &str = concat!(
    "+OK POP3 server ready <1896.697170952@dbc.mtview.ca.us>\r\n",
    "+OK maildrop has 2 messages\r\n",
    "+OK\r\n",
    "1 whqtswO00WBw418f9t5JxYwZ\r\n",
    "2 QhdPYR:00WBw1Ph7x7\r\n",
    ".\r\n",
    "+OK 120 octets\r\n",
    "From: a@example.com\r\n",
    "To: b@example.com\r\n",
    "Subject: first\r\n",
    "\r\n",
    "hello\r\n",
    ".\r\n",
    "+OK 300 octets\r\n",
    "Subject: second\r\n",
    "Content-Type: multipart/mixed; boundary=xyz\r\n",
    "\r\n",
    "--xyz\r\n",
    "Content-Type: text/plain\r\n",
    "\r\n",
    "part one\r\n",
    "--xyz\r\n",
    "Content-Type: text/html\r\n",
    "\r\n",
    "<b>part two</b>\r\n",
    "--xyz--\r\n",
    ".\r\n",
    "+OK dewey POP3 server signing off\r\n",
);

fn apop_config() -> AccountConfig {
    let mut config = AccountConfig::new("pop.example.com", "mrose", "tanstaaf");
    config.auth_method = AuthMechanism::ChallengeResponse;
    config
}

#[tokio::test]
async fn fetch_all_decodes_every_message_and_signs_out() {
    let (stream, sent) = MockStream::new(TWO_MESSAGES);
    let session = MailboxSession::from_stream(stream, &apop_config()).await.unwrap();

    let (result, retrieved) = session
        .scoped(|s| {
            Box::pin(async move {
                let result = s.fetch_all().await?;
                Ok((result, s.retrieved().clone()))
            })
        })
        .await
        .unwrap();

    assert_eq!(
        sent_lines(&sent),
        vec![
            "APOP mrose c4c9334bac560ecc979e58001b3e22fb",
            "UIDL",
            "RETR 1",
            "RETR 2",
            "QUIT",
        ]
    );

    let first = result.get("whqtswO00WBw418f9t5JxYwZ").unwrap();
    assert_eq!(first.from(), Some("a@example.com"));
    assert_eq!(first.body.len(), 1);
    assert_eq!(first.body[0].data(), Some(&Payload::Text("hello".into())));

    let second = result.get("QhdPYR:00WBw1Ph7x7").unwrap();
    assert_eq!(second.body.len(), 2);
    assert_eq!(
        second.body[0].data().and_then(Payload::as_text),
        Some("part one")
    );
    assert_eq!(
        second.body[1].data().and_then(Payload::as_text),
        Some("<b>part two</b>")
    );

    assert_eq!(retrieved.len(), 2);
}

#[tokio::test]
async fn error_inside_scope_still_sends_one_quit() {
    let script = concat!(
        "+OK ready\r\n",
        "+OK\r\n",
        "+OK\r\n",
        "+OK\r\n",
        "1 aaa\r\n",
        ".\r\n",
        "-ERR message deleted by another client\r\n",
        "+OK bye\r\n",
    );
    let (stream, sent) = MockStream::new(script);
    let config = AccountConfig::new("pop.example.com", "alice", "secret");
    let session = MailboxSession::from_stream(stream, &config).await.unwrap();

    let error = session
        .scoped(|s| Box::pin(async move { s.fetch_new(&KnownUids::new()).await }))
        .await
        .unwrap_err();

    assert!(matches!(error, Error::Fetch { .. }));
    let lines = sent_lines(&sent);
    assert_eq!(lines.iter().filter(|l| *l == "QUIT").count(), 1);
    assert_eq!(lines.last().map(String::as_str), Some("QUIT"));
}

#[tokio::test]
async fn nothing_new_fetches_nothing() {
    let script = concat!(
        "+OK ready\r\n",
        "+OK\r\n",
        "+OK\r\n",
        "+OK\r\n",
        "1 aaa\r\n",
        "2 bbb\r\n",
        ".\r\n",
        "+OK bye\r\n",
    );
    let (stream, sent) = MockStream::new(script);
    let config = AccountConfig::new("pop.example.com", "alice", "secret");
    let session = MailboxSession::from_stream(stream, &config).await.unwrap();

    let known: KnownUids = ["aaa", "bbb"].into_iter().collect();
    let result = session
        .scoped(|s| Box::pin(async move { s.fetch_new(&known).await }))
        .await
        .unwrap();

    assert!(result.is_empty());
    assert_eq!(sent_lines(&sent), vec!["USER alice", "PASS secret", "UIDL", "QUIT"]);
}

#[tokio::test]
async fn relationship_based_login_sends_rpop() {
    let script = concat!("+OK ready\r\n", "+OK\r\n", "+OK\r\n", "+OK bye\r\n");
    let (stream, sent) = MockStream::new(script);
    let mut config = AccountConfig::new("pop.example.com", "alice", "secret");
    config.auth_method = AuthMechanism::RelationshipBased;

    MailboxSession::from_stream(stream, &config).await.unwrap().quit().await;

    assert_eq!(sent_lines(&sent), vec!["RPOP alice", "PASS secret", "QUIT"]);
}
