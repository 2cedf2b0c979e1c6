//! Error types for the core library.

use popledger_pop3::{AuthMechanism, MessageNumber, ResponseCode, UniqueId};
use thiserror::Error;

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Transport failure: connect, TLS, timeout or a dropped connection.
    #[error("Connection failed: {0}")]
    Connection(#[source] popledger_pop3::Error),

    /// The server rejected the credentials or the mailbox is locked.
    #[error("Authentication with {mechanism} failed{}: {message}", code.as_ref().map(|c| format!(" [{c}]")).unwrap_or_default())]
    Authentication {
        /// Mechanism that was attempted.
        mechanism: AuthMechanism,
        /// RFC 2449 response code (e.g. `IN-USE`), if the server sent one.
        code: Option<ResponseCode>,
        /// Server text or local reason.
        message: String,
    },

    /// The server answered a well-formed `-ERR` outside authentication.
    #[error("Server refused the command{}: {message}", code.as_ref().map(|c| format!(" [{c}]")).unwrap_or_default())]
    Rejected {
        /// RFC 2449 response code, if the server sent one.
        code: Option<ResponseCode>,
        /// Server text.
        message: String,
    },

    /// Reply that breaks the POP3 grammar: bad status line, malformed
    /// listing line or an oversize line.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Retrieving one message of a batch failed; the batch was abandoned.
    #[error("Failed to fetch message {number} ({uid}): {source}")]
    Fetch {
        /// Unique id of the message.
        uid: UniqueId,
        /// Session message number.
        number: MessageNumber,
        /// Underlying failure.
        #[source]
        source: Box<Error>,
    },

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Classifies an error raised during authentication.
    pub(crate) fn authentication(mechanism: AuthMechanism, error: popledger_pop3::Error) -> Self {
        match error {
            popledger_pop3::Error::Server { code, message } => Self::Authentication {
                mechanism,
                code,
                message,
            },
            popledger_pop3::Error::ApopUnavailable => Self::Authentication {
                mechanism,
                code: None,
                message: error.to_string(),
            },
            other => other.into(),
        }
    }

    /// Returns the RFC 2449 response code of a `-ERR` reply.
    #[must_use]
    pub fn response_code(&self) -> Option<&ResponseCode> {
        match self {
            Self::Authentication { code, .. } | Self::Rejected { code, .. } => code.as_ref(),
            Self::Fetch { source, .. } => source.response_code(),
            _ => None,
        }
    }

    /// Returns true if the failure was caused by the transport.
    #[must_use]
    pub fn is_connection(&self) -> bool {
        match self {
            Self::Connection(_) => true,
            Self::Fetch { source, .. } => source.is_connection(),
            _ => false,
        }
    }
}

impl From<popledger_pop3::Error> for Error {
    fn from(error: popledger_pop3::Error) -> Self {
        use popledger_pop3::Error as Pop3;

        match error {
            Pop3::Protocol(message) | Pop3::InvalidState(message) => Self::Protocol(message),
            Pop3::Server { code, message } => Self::Rejected { code, message },
            Pop3::InvalidArgument(message) => Self::Config(message),
            transport => Self::Connection(transport),
        }
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_authentication_keeps_code() {
        let error = Error::authentication(
            AuthMechanism::Plain,
            popledger_pop3::Error::server(Some(ResponseCode::InUse), "maildrop locked"),
        );

        assert_eq!(error.response_code(), Some(&ResponseCode::InUse));
        assert_eq!(
            error.to_string(),
            "Authentication with plain failed [IN-USE]: maildrop locked"
        );
    }

    #[test]
    fn test_transport_errors_during_auth_stay_connection_errors() {
        let error = Error::authentication(
            AuthMechanism::Plain,
            popledger_pop3::Error::Timeout(Duration::from_secs(1)),
        );
        assert!(error.is_connection());
    }

    #[test]
    fn test_mapping() {
        assert!(matches!(
            Error::from(popledger_pop3::Error::Protocol("bad".into())),
            Error::Protocol(_)
        ));
        assert!(matches!(
            Error::from(popledger_pop3::Error::InvalidArgument("USER".into())),
            Error::Config(_)
        ));
        assert!(matches!(
            Error::from(popledger_pop3::Error::ConnectionClosed),
            Error::Connection(_)
        ));
        assert!(matches!(
            Error::from(popledger_pop3::Error::server(None, "no")),
            Error::Rejected { code: None, .. }
        ));
    }

    #[test]
    fn test_refusal_and_nonsense_are_distinct() {
        let refused = Error::from(popledger_pop3::Error::server(
            Some(ResponseCode::SysTemp),
            "UIDL not supported",
        ));
        let nonsense = Error::from(popledger_pop3::Error::Protocol(
            "Invalid status line: * garbage".into(),
        ));

        assert!(matches!(refused, Error::Rejected { .. }));
        assert!(matches!(nonsense, Error::Protocol(_)));
        assert_eq!(refused.response_code(), Some(&ResponseCode::SysTemp));
        assert_eq!(
            refused.to_string(),
            "Server refused the command [SYS/TEMP]: UIDL not supported"
        );
    }
}
