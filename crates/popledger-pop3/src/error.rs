//! Error types for POP3 operations.

use std::io;
use std::time::Duration;

use crate::types::ResponseCode;

/// Result type alias for POP3 operations.
pub type Result<T> = std::result::Result<T, Error>;

/// POP3 error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// TLS error.
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// Invalid DNS name for TLS.
    #[error("Invalid DNS name: {0}")]
    InvalidDnsName(#[from] rustls::pki_types::InvalidDnsNameError),

    /// Connect, handshake or read did not complete in time.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// The server closed the connection mid-reply.
    #[error("Connection closed by server")]
    ConnectionClosed,

    /// Server answered `-ERR`.
    #[error("Server returned -ERR{}: {message}", code.as_ref().map(|c| format!(" [{c}]")).unwrap_or_default())]
    Server {
        /// RFC 2449 extended response code, if the server sent one.
        code: Option<ResponseCode>,
        /// Error text from the server.
        message: String,
    },

    /// APOP was requested but the greeting carried no timestamp.
    #[error("Server greeting has no APOP timestamp")]
    ApopUnavailable,

    /// Protocol error (unexpected response).
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// A command argument would break the line framing.
    #[error("Invalid command argument: {0}")]
    InvalidArgument(String),

    /// Invalid state for operation.
    #[error("Invalid state for operation: {0}")]
    InvalidState(String),
}

impl Error {
    /// Creates a server error from a response code and message.
    #[must_use]
    pub fn server(code: Option<ResponseCode>, message: impl Into<String>) -> Self {
        Self::Server {
            code,
            message: message.into(),
        }
    }

    /// Returns the extended response code of a `-ERR` reply.
    #[must_use]
    pub const fn response_code(&self) -> Option<&ResponseCode> {
        match self {
            Self::Server { code, .. } => code.as_ref(),
            _ => None,
        }
    }

    /// Returns true if the mailbox is locked by another session (`[IN-USE]`).
    #[must_use]
    pub const fn is_in_use(&self) -> bool {
        matches!(self.response_code(), Some(ResponseCode::InUse))
    }

    /// Returns true if the failure happened below the POP3 layer.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Io(_) | Self::Tls(_) | Self::InvalidDnsName(_) | Self::Timeout(_) | Self::ConnectionClosed
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_server_error_display() {
        let err = Error::server(Some(ResponseCode::InUse), "mailbox locked");
        assert_eq!(err.to_string(), "Server returned -ERR [IN-USE]: mailbox locked");
        assert!(err.is_in_use());

        let err = Error::server(None, "no such message");
        assert_eq!(err.to_string(), "Server returned -ERR: no such message");
        assert!(!err.is_in_use());
    }

    #[test]
    fn test_transport_classification() {
        assert!(Error::ConnectionClosed.is_transport());
        assert!(Error::Timeout(Duration::from_secs(1)).is_transport());
        assert!(!Error::Protocol("bad".into()).is_transport());
        assert!(!Error::server(None, "no").is_transport());
    }
}
