//! POP3 command builder.

use std::fmt;

use crate::types::MessageNumber;
use crate::{Error, Result};

/// POP3 command.
#[derive(Clone, PartialEq, Eq)]
pub enum Command {
    /// USER - Name the mailbox
    User {
        /// Mailbox name
        username: String,
    },
    /// PASS - Mailbox password
    Pass {
        /// Password
        password: String,
    },
    /// APOP - Challenge-response login
    Apop {
        /// Mailbox name
        username: String,
        /// Lowercase hex MD5 digest of timestamp and secret
        digest: String,
    },
    /// RPOP - Host-relationship login (followed by PASS)
    Rpop {
        /// Mailbox name
        username: String,
    },
    /// STLS - Upgrade to TLS (RFC 2595)
    Stls,
    /// STAT - Maildrop summary
    Stat,
    /// UIDL - Unique-id listing for every message
    Uidl,
    /// RETR - Retrieve one message
    Retr(MessageNumber),
    /// NOOP - No operation
    Noop,
    /// QUIT - End the session and release the mailbox lock
    Quit,
}

impl Command {
    /// Serializes the command to bytes.
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();

        match self {
            Self::User { username } => {
                buf.extend_from_slice(b"USER ");
                buf.extend_from_slice(username.as_bytes());
            }
            Self::Pass { password } => {
                buf.extend_from_slice(b"PASS ");
                buf.extend_from_slice(password.as_bytes());
            }
            Self::Apop { username, digest } => {
                buf.extend_from_slice(b"APOP ");
                buf.extend_from_slice(username.as_bytes());
                buf.push(b' ');
                buf.extend_from_slice(digest.as_bytes());
            }
            Self::Rpop { username } => {
                buf.extend_from_slice(b"RPOP ");
                buf.extend_from_slice(username.as_bytes());
            }
            Self::Stls => buf.extend_from_slice(b"STLS"),
            Self::Stat => buf.extend_from_slice(b"STAT"),
            Self::Uidl => buf.extend_from_slice(b"UIDL"),
            Self::Retr(number) => {
                buf.extend_from_slice(format!("RETR {number}").as_bytes());
            }
            Self::Noop => buf.extend_from_slice(b"NOOP"),
            Self::Quit => buf.extend_from_slice(b"QUIT"),
        }

        buf.extend_from_slice(b"\r\n");
        buf
    }

    /// Checks that no argument could end the command line early.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if an argument contains CR, LF or
    /// another ASCII control character.
    pub fn check_arguments(&self) -> Result<()> {
        let (first, second) = match self {
            Self::User { username } | Self::Rpop { username } => (username.as_str(), ""),
            Self::Pass { password } => (password.as_str(), ""),
            Self::Apop { username, digest } => (username.as_str(), digest.as_str()),
            Self::Stls | Self::Stat | Self::Uidl | Self::Retr(_) | Self::Noop | Self::Quit => {
                return Ok(());
            }
        };

        if [first, second]
            .iter()
            .any(|arg| arg.chars().any(|c| c.is_ascii_control()))
        {
            return Err(Error::InvalidArgument(format!(
                "{} argument contains a control character",
                self.name()
            )));
        }
        Ok(())
    }

    /// Returns the command keyword.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::User { .. } => "USER",
            Self::Pass { .. } => "PASS",
            Self::Apop { .. } => "APOP",
            Self::Rpop { .. } => "RPOP",
            Self::Stls => "STLS",
            Self::Stat => "STAT",
            Self::Uidl => "UIDL",
            Self::Retr(_) => "RETR",
            Self::Noop => "NOOP",
            Self::Quit => "QUIT",
        }
    }
}

/// Log-safe rendering: secrets and digests are masked.
impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User { username } | Self::Rpop { username } => {
                write!(f, "{} {username}", self.name())
            }
            Self::Pass { .. } => write!(f, "PASS ****"),
            Self::Apop { username, .. } => write!(f, "APOP {username} ****"),
            Self::Retr(number) => write!(f, "RETR {number}"),
            _ => f.write_str(self.name()),
        }
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Command({self})")
    }
}

/// Computes the APOP digest: lowercase hex MD5 of `timestamp` followed by
/// `secret` (RFC 1939 section 7).
#[must_use]
pub fn apop_digest(timestamp: &str, secret: &str) -> String {
    let mut input = String::with_capacity(timestamp.len() + secret.len());
    input.push_str(timestamp);
    input.push_str(secret);
    format!("{:x}", md5::compute(input.as_bytes()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_line_breaks_in_arguments_rejected() {
        let cmd = Command::User {
            username: "alice\r\nDELE 1".to_string(),
        };
        assert!(matches!(cmd.check_arguments(), Err(Error::InvalidArgument(_))));

        let cmd = Command::Pass {
            password: "pw\nQUIT".to_string(),
        };
        let err = cmd.check_arguments().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid command argument: PASS argument contains a control character"
        );

        let cmd = Command::Pass {
            password: "spaces and ümlauts are fine".to_string(),
        };
        assert!(cmd.check_arguments().is_ok());
        assert!(Command::Quit.check_arguments().is_ok());
    }

    #[test]
    fn test_user_pass_commands() {
        let cmd = Command::User {
            username: "mrose".to_string(),
        };
        assert_eq!(cmd.serialize(), b"USER mrose\r\n");

        let cmd = Command::Pass {
            password: "secret".to_string(),
        };
        assert_eq!(cmd.serialize(), b"PASS secret\r\n");
    }

    #[test]
    fn test_apop_command() {
        let cmd = Command::Apop {
            username: "mrose".to_string(),
            digest: "c4c9334bac560ecc979e58001b3e22fb".to_string(),
        };
        assert_eq!(
            cmd.serialize(),
            b"APOP mrose c4c9334bac560ecc979e58001b3e22fb\r\n"
        );
    }

    #[test]
    fn test_rpop_command() {
        let cmd = Command::Rpop {
            username: "mrose".to_string(),
        };
        assert_eq!(cmd.serialize(), b"RPOP mrose\r\n");
    }

    #[test]
    fn test_retr_command() {
        let cmd = Command::Retr(MessageNumber::new(12).unwrap());
        assert_eq!(cmd.serialize(), b"RETR 12\r\n");
    }

    #[test]
    fn test_simple_commands() {
        assert_eq!(Command::Stls.serialize(), b"STLS\r\n");
        assert_eq!(Command::Stat.serialize(), b"STAT\r\n");
        assert_eq!(Command::Uidl.serialize(), b"UIDL\r\n");
        assert_eq!(Command::Noop.serialize(), b"NOOP\r\n");
        assert_eq!(Command::Quit.serialize(), b"QUIT\r\n");
    }

    #[test]
    fn test_display_masks_secrets() {
        let pass = Command::Pass {
            password: "hunter2".to_string(),
        };
        assert_eq!(pass.to_string(), "PASS ****");
        assert!(!format!("{pass:?}").contains("hunter2"));

        let apop = Command::Apop {
            username: "mrose".to_string(),
            digest: "abc".to_string(),
        };
        assert_eq!(apop.to_string(), "APOP mrose ****");
    }

    #[test]
    fn test_apop_digest_rfc1939_example() {
        assert_eq!(
            apop_digest("<1896.697170952@dbc.mtview.ca.us>", "tanstaaf"),
            "c4c9334bac560ecc979e58001b3e22fb"
        );
    }
}
