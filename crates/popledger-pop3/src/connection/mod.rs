//! POP3 connection management.
//!
//! This module provides connection handling for POP3 servers, including:
//! - Configuration (host, port, security mode, timeouts)
//! - TLS/plaintext stream abstraction
//! - Framed line I/O with multi-line response support
//! - Type-state client wrapper

mod client;
mod config;
mod framed;
mod stream;

pub use client::{Authorization, Client, Transaction};
pub use config::{Config, ConfigBuilder, Security};
pub use framed::FramedStream;
pub use stream::{Pop3Stream, connect};

use crate::Result;

/// Connects according to `config`, reads the greeting and, for
/// [`Security::StartTls`], upgrades the connection before returning.
///
/// # Errors
///
/// Returns an error if the connection, greeting or TLS upgrade fails, or
/// if any step exceeds its timeout.
pub async fn open(config: &Config) -> Result<Client<Pop3Stream, Authorization>> {
    let stream = connect(config).await?;
    let client = Client::from_stream_with_timeout(stream, config.io_timeout).await?;

    match config.security {
        Security::StartTls => {
            stream::with_timeout(config.connect_timeout, client.starttls(&config.host)).await
        }
        Security::None | Security::Implicit => Ok(client),
    }
}
