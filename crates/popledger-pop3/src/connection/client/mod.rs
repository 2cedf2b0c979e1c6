//! Type-state POP3 client connection.
//!
//! Uses the type-state pattern to enforce valid state transitions at compile time.
//! The POP3 session states (RFC 1939 section 3) are:
//!
//! - `Authorization`: Initial state after the greeting
//! - `Transaction`: After successful USER/PASS, APOP or RPOP; the maildrop is locked
//!
//! The UPDATE state is entered by [`Client::quit`], which consumes the client.

#![allow(clippy::missing_errors_doc)]

mod authorization;
mod states;
mod transaction;

use std::marker::PhantomData;

use tokio::io::{AsyncRead, AsyncWrite};

pub use self::states::{Authorization, Transaction};
use super::framed::FramedStream;
use crate::Result;
use crate::command::Command;
use crate::types::Reply;

/// POP3 client connection with type-state.
///
/// The type parameter `State` tracks the connection state at compile time.
pub struct Client<S, State> {
    pub(crate) stream: FramedStream<S>,
    pub(crate) greeting: String,
    pub(crate) timestamp: Option<String>,
    _state: PhantomData<State>,
}

// Manual Debug implementation since FramedStream doesn't implement Debug
impl<S, State> std::fmt::Debug for Client<S, State> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("greeting", &self.greeting)
            .field("state", &std::any::type_name::<State>())
            .finish_non_exhaustive()
    }
}

/// Shared implementation for all states.
impl<S, State> Client<S, State>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Returns the greeting text sent by the server.
    #[must_use]
    pub fn greeting(&self) -> &str {
        &self.greeting
    }

    /// Returns the APOP timestamp from the greeting, if any.
    #[must_use]
    pub fn apop_timestamp(&self) -> Option<&str> {
        self.timestamp.as_deref()
    }

    /// Returns a reference to the underlying stream.
    pub fn get_ref(&self) -> &S {
        self.stream.get_ref()
    }

    /// Sends QUIT and closes the session (available in any state).
    ///
    /// In the TRANSACTION state this releases the maildrop lock.
    pub async fn quit(mut self) -> Result<()> {
        self.send(&Command::Quit).await?;
        Ok(())
    }

    /// Sends a command and requires a `+OK` status line.
    pub(crate) async fn send(&mut self, command: &Command) -> Result<Reply> {
        self.stream.write_command(command).await?;
        let reply = self.stream.read_reply().await?;
        if !reply.is_ok() {
            tracing::debug!(command = command.name(), code = ?reply.code, text = %reply.text, "-ERR");
        }
        reply.into_result()
    }

    fn into_state<Next>(self) -> Client<S, Next> {
        Client {
            stream: self.stream,
            greeting: self.greeting,
            timestamp: self.timestamp,
            _state: PhantomData,
        }
    }
}
