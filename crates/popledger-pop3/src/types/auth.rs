//! Authentication mechanisms.

use std::fmt;
use std::str::FromStr;

/// How the client proves its identity in the AUTHORIZATION state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AuthMechanism {
    /// `USER` / `PASS`.
    #[default]
    Plain,
    /// `APOP` with an MD5 digest of the greeting timestamp and the secret.
    ChallengeResponse,
    /// `RPOP` followed by `PASS` (RFC 1081).
    RelationshipBased,
}

impl AuthMechanism {
    /// Returns the mechanism name as used in configuration files.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::ChallengeResponse => "apop",
            Self::RelationshipBased => "rpop",
        }
    }
}

impl fmt::Display for AuthMechanism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthMechanism {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "plain" | "user" => Ok(Self::Plain),
            "apop" | "challenge-response" => Ok(Self::ChallengeResponse),
            "rpop" | "relationship-based" => Ok(Self::RelationshipBased),
            other => Err(format!("unknown authentication method: {other}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_aliases() {
        assert_eq!("APOP".parse::<AuthMechanism>().unwrap(), AuthMechanism::ChallengeResponse);
        assert_eq!(
            "relationship-based".parse::<AuthMechanism>().unwrap(),
            AuthMechanism::RelationshipBased
        );
        assert_eq!("".parse::<AuthMechanism>().unwrap(), AuthMechanism::Plain);
        assert!("kerberos".parse::<AuthMechanism>().is_err());
    }

    #[test]
    fn test_display_round_trips() {
        for mechanism in [
            AuthMechanism::Plain,
            AuthMechanism::ChallengeResponse,
            AuthMechanism::RelationshipBased,
        ] {
            assert_eq!(mechanism.to_string().parse::<AuthMechanism>().unwrap(), mechanism);
        }
    }
}
