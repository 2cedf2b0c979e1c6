//! Transport for POP3 connections: plain TCP or TLS over TCP.

#![allow(clippy::missing_errors_doc)]

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use rustls::pki_types::ServerName;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;

use super::config::{Config, Security};
use crate::{Error, Result};

/// Byte stream the POP3 client runs over.
pub enum Pop3Stream {
    /// Plaintext TCP, before STLS or with `Security::None`.
    Plain(TcpStream),
    /// TLS session (boxed to keep the enum small).
    Tls(Box<TlsStream<TcpStream>>),
}

trait Transport: AsyncRead + AsyncWrite + Unpin {}

impl<T: AsyncRead + AsyncWrite + Unpin> Transport for T {}

impl Pop3Stream {
    /// Upgrades a plaintext stream to TLS after a successful `STLS`.
    pub async fn upgrade_to_tls(self, host: &str) -> Result<Self> {
        match self {
            Self::Plain(tcp) => handshake(tcp, host).await,
            Self::Tls(_) => Err(Error::InvalidState("STLS on a TLS connection".to_string())),
        }
    }

    /// Returns true once the stream is encrypted.
    #[must_use]
    pub const fn is_tls(&self) -> bool {
        matches!(self, Self::Tls(_))
    }

    fn transport(&mut self) -> &mut dyn Transport {
        match self {
            Self::Plain(tcp) => tcp as &mut dyn Transport,
            Self::Tls(tls) => tls.as_mut(),
        }
    }
}

impl std::fmt::Debug for Pop3Stream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(if self.is_tls() { "Pop3Stream::Tls" } else { "Pop3Stream::Plain" })
    }
}

impl AsyncRead for Pop3Stream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(self.get_mut().transport()).poll_read(cx, buf)
    }
}

impl AsyncWrite for Pop3Stream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(self.get_mut().transport()).poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(self.get_mut().transport()).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(self.get_mut().transport()).poll_shutdown(cx)
    }
}

/// Runs the TLS handshake on `tcp`, verifying `host` against the
/// webpki roots.
async fn handshake(tcp: TcpStream, host: &str) -> Result<Pop3Stream> {
    let roots = rustls::RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    };
    let config = rustls::ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();

    let server_name = ServerName::try_from(host.to_string())?;
    let tls = TlsConnector::from(Arc::new(config))
        .connect(server_name, tcp)
        .await?;
    Ok(Pop3Stream::Tls(Box::new(tls)))
}

/// Opens the transport described by `config` within its connect timeout.
///
/// For [`Security::StartTls`] this returns a plaintext stream; the upgrade
/// happens after the greeting.
pub async fn connect(config: &Config) -> Result<Pop3Stream> {
    tracing::debug!(
        host = %config.host,
        port = config.port,
        security = ?config.security,
        "Connecting to POP3 server"
    );

    let connecting = async {
        let tcp = TcpStream::connect((config.host.as_str(), config.port)).await?;
        match config.security {
            Security::Implicit => handshake(tcp, &config.host).await,
            Security::None | Security::StartTls => Ok(Pop3Stream::Plain(tcp)),
        }
    };

    with_timeout(config.connect_timeout, connecting).await
}

/// Runs `future`, failing with [`Error::Timeout`] once `limit` elapses.
pub(crate) async fn with_timeout<T>(
    limit: Duration,
    future: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::time::timeout(limit, future)
        .await
        .map_err(|_| Error::Timeout(limit))?
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

    #[tokio::test]
    async fn test_with_timeout_expires() {
        let result: Result<()> = with_timeout(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(Error::Timeout(_))));
    }

    #[tokio::test]
    async fn test_connect_refused_is_io_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let config = Config::builder("127.0.0.1")
            .port(port)
            .security(Security::None)
            .build();
        let result = connect(&config).await;
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[tokio::test]
    async fn test_starttls_connect_stays_plain() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let config = Config::builder("127.0.0.1")
            .port(port)
            .security(Security::StartTls)
            .build();

        let (stream, accepted) = tokio::join!(connect(&config), listener.accept());
        let stream = stream.unwrap();
        let _server = accepted.unwrap();
        assert!(!stream.is_tls());
        assert_eq!(format!("{stream:?}"), "Pop3Stream::Plain");
    }
}
