//! Authenticated POP3 mailbox session.
//!
//! A [`MailboxSession`] is acquired already authenticated and holds the
//! maildrop lock until [`MailboxSession::quit`] consumes it. Prefer
//! [`MailboxSession::scoped`] or [`MailboxSession::with_session`], which
//! sign out on every exit path.

use std::future::Future;
use std::pin::Pin;

use popledger_pop3::connection::open;
use popledger_pop3::{Authorization, Client, Pop3Stream, Stat, Transaction};
use tokio::io::{AsyncRead, AsyncWrite};

use super::model::{FetchResult, KnownUids, UidIndex};
use crate::account::AccountConfig;
use crate::{Error, Result};

/// Future returned by the closure passed to [`MailboxSession::scoped`].
pub type SessionFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a>>;

/// An authenticated POP3 session in the TRANSACTION state.
pub struct MailboxSession<S> {
    client: Client<S, Transaction>,
    retrieved: KnownUids,
}

impl<S> std::fmt::Debug for MailboxSession<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailboxSession")
            .field("client", &self.client)
            .field("retrieved", &self.retrieved.len())
            .finish()
    }
}

impl MailboxSession<Pop3Stream> {
    /// Connects to the configured server and authenticates.
    ///
    /// # Errors
    ///
    /// Returns `Error::Connection` if the server cannot be reached in time,
    /// or `Error::Authentication` if the credentials are rejected or the
    /// maildrop is locked.
    pub async fn open(config: &AccountConfig) -> Result<Self> {
        tracing::info!(
            host = %config.host,
            port = config.port(),
            security = ?config.security(),
            "Opening mailbox session"
        );
        let client = open(&config.connection_config()).await?;
        Self::login(client, config).await
    }

    /// Opens a session, runs `f` against it and signs out.
    ///
    /// # Errors
    ///
    /// Returns the error from opening the session or the result of `f`.
    pub async fn with_session<T, F>(config: &AccountConfig, f: F) -> Result<T>
    where
        F: for<'a> FnOnce(&'a mut Self) -> SessionFuture<'a, T>,
    {
        Self::open(config).await?.scoped(f).await
    }
}

impl<S> MailboxSession<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Starts a session on an already connected stream.
    ///
    /// # Errors
    ///
    /// Returns an error if the greeting is not `+OK` or authentication fails.
    pub async fn from_stream(stream: S, config: &AccountConfig) -> Result<Self> {
        let client =
            Client::from_stream_with_timeout(stream, config.options.io_timeout()).await?;
        Self::login(client, config).await
    }

    async fn login(client: Client<S, Authorization>, config: &AccountConfig) -> Result<Self> {
        let mechanism = config.auth_method;
        let client = client
            .authenticate(mechanism, &config.username, &config.password)
            .await
            .map_err(|e| Error::authentication(mechanism, e))?;

        tracing::info!(user = %config.username, %mechanism, "Authenticated");
        Ok(Self {
            client,
            retrieved: KnownUids::new(),
        })
    }

    /// Runs `f` against the session, then signs out exactly once.
    ///
    /// The result of `f` is returned unchanged, whether it succeeded or not.
    ///
    /// # Errors
    ///
    /// Returns whatever `f` returned.
    pub async fn scoped<T, F>(mut self, f: F) -> Result<T>
    where
        F: for<'a> FnOnce(&'a mut Self) -> SessionFuture<'a, T>,
    {
        let result = f(&mut self).await;
        self.quit().await;
        result
    }

    /// Sends QUIT and releases the maildrop lock.
    ///
    /// Failures are logged and otherwise ignored.
    pub async fn quit(self) {
        match self.client.quit().await {
            Ok(()) => tracing::debug!("Signed out"),
            Err(e) => tracing::warn!(error = %e, "Failed to sign out cleanly"),
        }
    }

    /// Lists every message by unique id.
    ///
    /// # Errors
    ///
    /// Returns an error if UIDL fails or a listing line is malformed.
    pub async fn list_unique_ids(&mut self) -> Result<UidIndex> {
        let index: UidIndex = self.client.uidl().await?.into_iter().collect();
        tracing::debug!(count = index.len(), "Listed unique ids");
        Ok(index)
    }

    /// Lists the messages whose unique id is not in `known`.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing fails.
    pub async fn list_new_unique_ids(&mut self, known: &KnownUids) -> Result<UidIndex> {
        let new = self.list_unique_ids().await?.without(known);
        tracing::debug!(new = new.len(), known = known.len(), "Computed new unique ids");
        Ok(new)
    }

    /// Retrieves and decodes every message in `index`, in ascending
    /// message-number order.
    ///
    /// # Errors
    ///
    /// Returns `Error::Fetch` naming the first message that could not be
    /// retrieved; messages fetched before it are not returned.
    pub async fn fetch_messages(&mut self, index: &UidIndex) -> Result<FetchResult> {
        let mut result = FetchResult::new();

        for (number, uid) in index.by_number() {
            let raw = self.client.retr(number).await.map_err(|e| Error::Fetch {
                uid: uid.clone(),
                number,
                source: Box::new(e.into()),
            })?;

            let message = popledger_mime::parse(&raw);
            tracing::debug!(
                %uid,
                number = number.get(),
                size = raw.len(),
                subject = message.subject().unwrap_or_default(),
                "Fetched message"
            );

            self.retrieved.insert(uid.clone());
            result.insert(uid.clone(), message);
        }

        Ok(result)
    }

    /// Retrieves every message in the maildrop.
    ///
    /// # Errors
    ///
    /// Returns an error if listing or any retrieval fails.
    pub async fn fetch_all(&mut self) -> Result<FetchResult> {
        let index = self.list_unique_ids().await?;
        self.fetch_messages(&index).await
    }

    /// Retrieves the messages not in `known`.
    ///
    /// # Errors
    ///
    /// Returns an error if listing or any retrieval fails.
    pub async fn fetch_new(&mut self, known: &KnownUids) -> Result<FetchResult> {
        let index = self.list_new_unique_ids(known).await?;
        self.fetch_messages(&index).await
    }

    /// Unique ids retrieved successfully during this session.
    #[must_use]
    pub const fn retrieved(&self) -> &KnownUids {
        &self.retrieved
    }

    /// Returns the message count and maildrop size.
    ///
    /// # Errors
    ///
    /// Returns an error if STAT fails.
    pub async fn stat(&mut self) -> Result<Stat> {
        Ok(self.client.stat().await?)
    }

    /// Keeps the session alive.
    ///
    /// # Errors
    ///
    /// Returns an error if NOOP fails.
    pub async fn noop(&mut self) -> Result<()> {
        Ok(self.client.noop().await?)
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
    use popledger_pop3::{AuthMechanism, ResponseCode};
    use tokio_test::io::Builder;

    fn config() -> AccountConfig {
        AccountConfig::new("pop.example.com", "alice", "secret")
    }

    fn logged_in() -> Builder {
        let mut builder = Builder::new();
        builder
            .read(b"+OK ready\r\n")
            .write(b"USER alice\r\n")
            .read(b"+OK\r\n")
            .write(b"PASS secret\r\n")
            .read(b"+OK 2 messages\r\n");
        builder
    }

    #[tokio::test]
    async fn test_list_unique_ids() {
        let mock = logged_in()
            .write(b"UIDL\r\n")
            .read(b"+OK\r\n1 aaa\r\n2 bbb\r\n.\r\n")
            .build();
        let mut session = MailboxSession::from_stream(mock, &config()).await.unwrap();

        let index = session.list_unique_ids().await.unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index.get("bbb").map(|n| n.get()), Some(2));
    }

    #[tokio::test]
    async fn test_listing_twice_is_stable() {
        let mock = logged_in()
            .write(b"UIDL\r\n")
            .read(b"+OK\r\n1 aaa\r\n2 bbb\r\n.\r\n")
            .write(b"UIDL\r\n")
            .read(b"+OK\r\n1 aaa\r\n2 bbb\r\n.\r\n")
            .build();
        let mut session = MailboxSession::from_stream(mock, &config()).await.unwrap();

        let first = session.list_unique_ids().await.unwrap();
        let second = session.list_unique_ids().await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_fetch_new_skips_known() {
        let mock = logged_in()
            .write(b"UIDL\r\n")
            .read(b"+OK\r\n1 aaa\r\n2 bbb\r\n.\r\n")
            .write(b"RETR 2\r\n")
            .read(b"+OK\r\nSubject: second\r\n\r\nhello\r\n.\r\n")
            .build();
        let mut session = MailboxSession::from_stream(mock, &config()).await.unwrap();

        let known: KnownUids = ["aaa"].into_iter().collect();
        let result = session.fetch_new(&known).await.unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result.get("bbb").unwrap().subject(), Some("second"));
        assert!(session.retrieved().contains("bbb"));
        assert!(!session.retrieved().contains("aaa"));
    }

    #[tokio::test]
    async fn test_fetch_failure_names_message() {
        let mock = logged_in()
            .write(b"RETR 1\r\n")
            .read(b"+OK\r\nSubject: one\r\n\r\nbody\r\n.\r\n")
            .write(b"RETR 2\r\n")
            .read(b"-ERR no such message\r\n")
            .build();
        let mut session = MailboxSession::from_stream(mock, &config()).await.unwrap();

        let index: UidIndex = [
            (popledger_pop3::MessageNumber::new(2).unwrap(), "b".into()),
            (popledger_pop3::MessageNumber::new(1).unwrap(), "a".into()),
        ]
        .into_iter()
        .collect();

        let error = session.fetch_messages(&index).await.unwrap_err();
        let Error::Fetch { uid, number, source } = error else {
            panic!("expected fetch error, got {error:?}");
        };
        assert_eq!(uid.as_str(), "b");
        assert_eq!(number.get(), 2);
        assert!(matches!(*source, Error::Rejected { .. }));
        assert!(session.retrieved().contains("a"));
    }

    #[tokio::test]
    async fn test_refusal_differs_from_garbage() {
        let mock = logged_in()
            .write(b"UIDL\r\n")
            .read(b"-ERR UIDL not supported\r\n")
            .write(b"UIDL\r\n")
            .read(b"* garbage\r\n")
            .build();
        let mut session = MailboxSession::from_stream(mock, &config()).await.unwrap();

        let refused = session.list_unique_ids().await.unwrap_err();
        let nonsense = session.list_unique_ids().await.unwrap_err();

        assert!(
            matches!(&refused, Error::Rejected { message, .. } if message == "UIDL not supported"),
            "got {refused:?}"
        );
        assert!(matches!(nonsense, Error::Protocol(_)), "got {nonsense:?}");
    }

    #[tokio::test]
    async fn test_scoped_quits_after_error() {
        let mock = logged_in()
            .write(b"UIDL\r\n")
            .read(b"+OK\r\nnot a listing\r\n.\r\n")
            .write(b"QUIT\r\n")
            .read(b"+OK bye\r\n")
            .build();
        let session = MailboxSession::from_stream(mock, &config()).await.unwrap();

        let result = session
            .scoped(|s| Box::pin(async move { s.list_unique_ids().await }))
            .await;
        assert!(matches!(result, Err(Error::Protocol(_))));
    }

    #[tokio::test]
    async fn test_quit_failure_is_swallowed() {
        let mock = logged_in().write(b"QUIT\r\n").build();
        let session = MailboxSession::from_stream(mock, &config()).await.unwrap();

        let value = session.scoped(|_| Box::pin(async { Ok(7) })).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_locked_maildrop() {
        let mock = Builder::new()
            .read(b"+OK ready\r\n")
            .write(b"USER alice\r\n")
            .read(b"+OK\r\n")
            .write(b"PASS secret\r\n")
            .read(b"-ERR [IN-USE] maildrop already locked\r\n")
            .write(b"QUIT\r\n")
            .read(b"+OK\r\n")
            .build();

        let error = MailboxSession::from_stream(mock, &config()).await.unwrap_err();
        assert!(matches!(
            error,
            Error::Authentication {
                mechanism: AuthMechanism::Plain,
                ..
            }
        ));
        assert_eq!(error.response_code(), Some(&ResponseCode::InUse));
    }

    #[tokio::test]
    async fn test_apop_without_timestamp() {
        let mock = Builder::new()
            .read(b"+OK ready\r\n")
            .write(b"QUIT\r\n")
            .read(b"+OK\r\n")
            .build();
        let mut config = config();
        config.auth_method = AuthMechanism::ChallengeResponse;

        let error = MailboxSession::from_stream(mock, &config).await.unwrap_err();
        assert!(matches!(error, Error::Authentication { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_server_times_out() {
        let (client, _server) = tokio::io::duplex(64);
        let mut config = config();
        config.options.io_timeout_secs = 5;

        let error = MailboxSession::from_stream(client, &config).await.unwrap_err();
        assert!(error.is_connection());
        assert!(matches!(
            error,
            Error::Connection(popledger_pop3::Error::Timeout(_))
        ));
    }

    #[tokio::test]
    async fn test_stat_and_noop() {
        let mock = logged_in()
            .write(b"STAT\r\n")
            .read(b"+OK 2 320\r\n")
            .write(b"NOOP\r\n")
            .read(b"+OK\r\n")
            .build();
        let mut session = MailboxSession::from_stream(mock, &config()).await.unwrap();

        let stat = session.stat().await.unwrap();
        assert_eq!((stat.count, stat.size), (2, 320));
        session.noop().await.unwrap();
    }
}
