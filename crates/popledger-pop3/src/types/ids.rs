//! Message identifiers.

use std::fmt;
use std::num::NonZeroU32;

/// Server-assigned identifier that stays stable across sessions (UIDL).
///
/// RFC 1939 limits it to 1-70 printable characters; this type only ever
/// holds what the server sent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UniqueId(String);

impl UniqueId {
    /// Wraps a unique-id string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the id and returns the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for UniqueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UniqueId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for UniqueId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::borrow::Borrow<str> for UniqueId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Position of a message within one session (1-based).
///
/// Only meaningful for the session that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageNumber(NonZeroU32);

impl MessageNumber {
    /// Creates a message number, returning `None` for zero.
    #[must_use]
    pub const fn new(value: u32) -> Option<Self> {
        match NonZeroU32::new(value) {
            Some(n) => Some(Self(n)),
            None => None,
        }
    }

    /// Returns the numeric value.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0.get()
    }
}

impl fmt::Display for MessageNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_message_number_rejects_zero() {
        assert!(MessageNumber::new(0).is_none());
        assert_eq!(MessageNumber::new(7).unwrap().get(), 7);
    }

    #[test]
    fn test_message_number_ordering() {
        assert!(MessageNumber::new(2).unwrap() < MessageNumber::new(10).unwrap());
    }

    #[test]
    fn test_unique_id_display() {
        let uid = UniqueId::from("QhdPYR:00WBw1Ph7x7");
        assert_eq!(uid.to_string(), "QhdPYR:00WBw1Ph7x7");
        assert_eq!(uid.as_str(), "QhdPYR:00WBw1Ph7x7");
    }
}
