//! POP3 reply types.

use std::fmt;

/// Status indicator of a reply line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// `+OK`
    Ok,
    /// `-ERR`
    Err,
}

/// Single-line POP3 reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Positive or negative.
    pub status: Status,
    /// Extended response code (RFC 2449), only parsed on `-ERR`.
    pub code: Option<ResponseCode>,
    /// Text after the status indicator and code.
    pub text: String,
}

impl Reply {
    /// Creates a new reply.
    #[must_use]
    pub fn new(status: Status, code: Option<ResponseCode>, text: impl Into<String>) -> Self {
        Self {
            status,
            code,
            text: text.into(),
        }
    }

    /// Returns true for `+OK`.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }

    /// Converts a `-ERR` reply into an error.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Server`] unless the reply is `+OK`.
    pub fn into_result(self) -> crate::Result<Self> {
        match self.status {
            Status::Ok => Ok(self),
            Status::Err => Err(crate::Error::Server {
                code: self.code,
                message: self.text,
            }),
        }
    }
}

/// Extended response codes (RFC 2449 section 8, RFC 3206).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResponseCode {
    /// `IN-USE`: the mailbox is locked by another session.
    InUse,
    /// `LOGIN-DELAY`: logged in too recently.
    LoginDelay,
    /// `SYS/TEMP`: transient system failure.
    SysTemp,
    /// `SYS/PERM`: permanent system failure.
    SysPerm,
    /// `AUTH`: credentials were rejected.
    Auth,
    /// Any other code.
    Other(String),
}

impl ResponseCode {
    /// Parses a code from the text between brackets.
    #[must_use]
    pub fn parse(code: &str) -> Self {
        match code.to_ascii_uppercase().as_str() {
            "IN-USE" => Self::InUse,
            "LOGIN-DELAY" => Self::LoginDelay,
            "SYS/TEMP" => Self::SysTemp,
            "SYS/PERM" => Self::SysPerm,
            "AUTH" => Self::Auth,
            _ => Self::Other(code.to_string()),
        }
    }

    /// Returns the code as sent on the wire.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::InUse => "IN-USE",
            Self::LoginDelay => "LOGIN-DELAY",
            Self::SysTemp => "SYS/TEMP",
            Self::SysPerm => "SYS/PERM",
            Self::Auth => "AUTH",
            Self::Other(code) => code,
        }
    }
}

impl fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maildrop summary from `STAT`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stat {
    /// Number of messages.
    pub count: u32,
    /// Total size in octets.
    pub size: u64,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_response_code_parse() {
        assert_eq!(ResponseCode::parse("in-use"), ResponseCode::InUse);
        assert_eq!(ResponseCode::parse("SYS/TEMP"), ResponseCode::SysTemp);
        assert_eq!(
            ResponseCode::parse("X-VENDOR"),
            ResponseCode::Other("X-VENDOR".to_string())
        );
    }

    #[test]
    fn test_into_result() {
        let ok = Reply::new(Status::Ok, None, "2 320");
        assert!(ok.into_result().is_ok());

        let err = Reply::new(Status::Err, Some(ResponseCode::InUse), "locked");
        let err = err.into_result().unwrap_err();
        assert!(err.is_in_use());
    }
}
