//! Implementation for the AUTHORIZATION state.

use std::marker::PhantomData;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};

use super::Client;
use super::states::{Authorization, Transaction};
use crate::command::{Command, apop_digest};
use crate::connection::framed::FramedStream;
use crate::connection::stream::Pop3Stream;
use crate::parser::apop_timestamp;
use crate::types::AuthMechanism;
use crate::{Error, Result};

impl<S> Client<S, Authorization>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a new client from a connected stream.
    ///
    /// Reads the server greeting and remembers its APOP timestamp.
    pub async fn from_stream(stream: S) -> Result<Self> {
        Self::from_framed(FramedStream::new(stream)).await
    }

    /// Like [`Client::from_stream`], with every reply read bounded by `io_timeout`.
    pub async fn from_stream_with_timeout(stream: S, io_timeout: Duration) -> Result<Self> {
        Self::from_framed(FramedStream::new(stream).with_io_timeout(Some(io_timeout))).await
    }

    async fn from_framed(mut stream: FramedStream<S>) -> Result<Self> {
        let greeting = stream.read_reply().await?.into_result()?;
        let timestamp = apop_timestamp(&greeting.text).map(str::to_string);

        tracing::debug!(greeting = %greeting.text, apop = timestamp.is_some(), "Greeting");

        Ok(Self {
            stream,
            greeting: greeting.text,
            timestamp,
            _state: PhantomData,
        })
    }

    /// Authenticates with the given mechanism.
    ///
    /// Consumes self and returns a client in the TRANSACTION state on
    /// success. If the server rejects the credentials, QUIT is sent on a
    /// best-effort basis before the error is returned.
    pub async fn authenticate(
        self,
        mechanism: AuthMechanism,
        username: &str,
        secret: &str,
    ) -> Result<Client<S, Transaction>> {
        match mechanism {
            AuthMechanism::Plain => self.login(username, secret).await,
            AuthMechanism::ChallengeResponse => self.apop(username, secret).await,
            AuthMechanism::RelationshipBased => self.rpop(username, secret).await,
        }
    }

    /// Authenticates with USER and PASS.
    pub async fn login(mut self, username: &str, password: &str) -> Result<Client<S, Transaction>> {
        let result = self.user_pass(Some(username), password).await;
        self.finish_authentication(result).await
    }

    /// Authenticates with APOP using the greeting timestamp.
    pub async fn apop(mut self, username: &str, secret: &str) -> Result<Client<S, Transaction>> {
        let digest = self
            .timestamp
            .as_deref()
            .map(|timestamp| apop_digest(timestamp, secret));
        let result = match digest {
            Some(digest) => {
                let command = Command::Apop {
                    username: username.to_string(),
                    digest,
                };
                self.send(&command).await.map(|_| ())
            }
            None => Err(Error::ApopUnavailable),
        };
        self.finish_authentication(result).await
    }

    /// Authenticates with RPOP followed by PASS.
    pub async fn rpop(mut self, username: &str, password: &str) -> Result<Client<S, Transaction>> {
        let command = Command::Rpop {
            username: username.to_string(),
        };
        let result = match self.send(&command).await {
            Ok(_) => self.user_pass(None, password).await,
            Err(e) => Err(e),
        };
        self.finish_authentication(result).await
    }

    async fn user_pass(&mut self, username: Option<&str>, password: &str) -> Result<()> {
        if let Some(username) = username {
            self.send(&Command::User {
                username: username.to_string(),
            })
            .await?;
        }
        self.send(&Command::Pass {
            password: password.to_string(),
        })
        .await?;
        Ok(())
    }

    async fn finish_authentication(self, result: Result<()>) -> Result<Client<S, Transaction>> {
        match result {
            Ok(()) => {
                tracing::debug!("Authenticated, maildrop locked");
                Ok(self.into_state())
            }
            Err(e @ (Error::Server { .. } | Error::ApopUnavailable)) => {
                if let Err(quit_error) = self.quit().await {
                    tracing::warn!(?quit_error, "QUIT after rejected login failed");
                }
                Err(e)
            }
            Err(e) => Err(e),
        }
    }
}

impl Client<Pop3Stream, Authorization> {
    /// Upgrades the connection to TLS using STLS (RFC 2595).
    ///
    /// The greeting and APOP timestamp from the plaintext phase are kept.
    pub async fn starttls(mut self, host: &str) -> Result<Self> {
        self.send(&Command::Stls).await?;

        let io_timeout = self.stream.io_timeout();
        let tls = self.stream.into_inner().upgrade_to_tls(host).await?;
        tracing::debug!(host, "Upgraded to TLS");

        Ok(Self {
            stream: FramedStream::new(tls).with_io_timeout(io_timeout),
            greeting: self.greeting,
            timestamp: self.timestamp,
            _state: PhantomData,
        })
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
    use crate::types::ResponseCode;
    use tokio_test::io::Builder;

    const GREETING: &[u8] = b"+OK POP3 server ready <1896.697170952@dbc.mtview.ca.us>\r\n";

    #[tokio::test]
    async fn test_greeting_timestamp() {
        let mock = Builder::new().read(GREETING).build();
        let client = Client::from_stream(mock).await.unwrap();

        assert_eq!(
            client.apop_timestamp(),
            Some("<1896.697170952@dbc.mtview.ca.us>")
        );
        assert!(client.greeting().starts_with("POP3 server ready"));
    }

    #[tokio::test]
    async fn test_negative_greeting() {
        let mock = Builder::new().read(b"-ERR [SYS/TEMP] try later\r\n").build();
        let result = Client::from_stream(mock).await;

        let err = result.unwrap_err();
        assert_eq!(err.response_code(), Some(&ResponseCode::SysTemp));
    }

    #[tokio::test]
    async fn test_login() {
        let mock = Builder::new()
            .read(GREETING)
            .write(b"USER mrose\r\n")
            .read(b"+OK mrose is a real hoopy frood\r\n")
            .write(b"PASS secret\r\n")
            .read(b"+OK maildrop has 2 messages (320 octets)\r\n")
            .build();

        let client = Client::from_stream(mock).await.unwrap();
        assert!(client.login("mrose", "secret").await.is_ok());
    }

    #[tokio::test]
    async fn test_apop_rfc1939_example() {
        let mock = Builder::new()
            .read(GREETING)
            .write(b"APOP mrose c4c9334bac560ecc979e58001b3e22fb\r\n")
            .read(b"+OK maildrop has 1 message (369 octets)\r\n")
            .build();

        let client = Client::from_stream(mock).await.unwrap();
        let client = client
            .authenticate(AuthMechanism::ChallengeResponse, "mrose", "tanstaaf")
            .await;
        assert!(client.is_ok());
    }

    #[tokio::test]
    async fn test_apop_without_timestamp_quits() {
        let mock = Builder::new()
            .read(b"+OK POP3 ready\r\n")
            .write(b"QUIT\r\n")
            .read(b"+OK bye\r\n")
            .build();

        let client = Client::from_stream(mock).await.unwrap();
        let result = client.apop("mrose", "tanstaaf").await;
        assert!(matches!(result, Err(Error::ApopUnavailable)));
    }

    #[tokio::test]
    async fn test_rpop() {
        let mock = Builder::new()
            .read(GREETING)
            .write(b"RPOP mrose\r\n")
            .read(b"+OK\r\n")
            .write(b"PASS secret\r\n")
            .read(b"+OK\r\n")
            .build();

        let client = Client::from_stream(mock).await.unwrap();
        let client = client
            .authenticate(AuthMechanism::RelationshipBased, "mrose", "secret")
            .await;
        assert!(client.is_ok());
    }

    #[tokio::test]
    async fn test_rejected_password_sends_quit() {
        let mock = Builder::new()
            .read(GREETING)
            .write(b"USER mrose\r\n")
            .read(b"+OK\r\n")
            .write(b"PASS wrong\r\n")
            .read(b"-ERR [AUTH] invalid password\r\n")
            .write(b"QUIT\r\n")
            .read(b"+OK\r\n")
            .build();

        let client = Client::from_stream(mock).await.unwrap();
        let err = client.login("mrose", "wrong").await.unwrap_err();
        assert_eq!(err.response_code(), Some(&ResponseCode::Auth));
    }
}
