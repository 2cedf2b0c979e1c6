//! Mailbox snapshot types.

use std::collections::{BTreeMap, BTreeSet};

use popledger_mime::ParsedMessage;
use popledger_pop3::{MessageNumber, UniqueId};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Deserializer, Serialize};

/// Unique ids of the current session mapped to their message numbers.
///
/// Rebuilt by every listing; the numbers are only valid for the session
/// that produced them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UidIndex {
    entries: BTreeMap<UniqueId, MessageNumber>,
}

impl UidIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry. A unique id that is already present keeps its first
    /// number; returns false in that case.
    pub fn insert(&mut self, uid: UniqueId, number: MessageNumber) -> bool {
        match self.entries.entry(uid) {
            std::collections::btree_map::Entry::Occupied(_) => false,
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(number);
                true
            }
        }
    }

    /// Looks up the message number of a unique id.
    #[must_use]
    pub fn get(&self, uid: &str) -> Option<MessageNumber> {
        self.entries.get(uid).copied()
    }

    /// Checks if a unique id is listed.
    #[must_use]
    pub fn contains(&self, uid: &str) -> bool {
        self.entries.contains_key(uid)
    }

    /// Number of listed messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is listed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over the entries, ordered by unique id.
    pub fn iter(&self) -> impl Iterator<Item = (&UniqueId, MessageNumber)> {
        self.entries.iter().map(|(uid, number)| (uid, *number))
    }

    /// Returns the entries ordered by message number.
    #[must_use]
    pub fn by_number(&self) -> Vec<(MessageNumber, &UniqueId)> {
        let mut entries: Vec<_> = self.entries.iter().map(|(uid, n)| (*n, uid)).collect();
        entries.sort_unstable_by_key(|(number, _)| *number);
        entries
    }

    /// Returns the entries whose unique id is not in `known`.
    #[must_use]
    pub fn without(&self, known: &KnownUids) -> Self {
        Self {
            entries: self
                .entries
                .iter()
                .filter(|(uid, _)| !known.contains(uid.as_str()))
                .map(|(uid, number)| (uid.clone(), *number))
                .collect(),
        }
    }
}

impl FromIterator<(MessageNumber, UniqueId)> for UidIndex {
    fn from_iter<I: IntoIterator<Item = (MessageNumber, UniqueId)>>(iter: I) -> Self {
        let mut index = Self::new();
        for (number, uid) in iter {
            if !index.insert(uid.clone(), number) {
                tracing::debug!(uid = %uid, number = number.get(), "Duplicate unique id ignored");
            }
        }
        index
    }
}

/// Unique ids the caller has already seen.
///
/// Serialized as a JSON array of strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KnownUids {
    uids: BTreeSet<UniqueId>,
}

impl KnownUids {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks if a unique id is known.
    #[must_use]
    pub fn contains(&self, uid: &str) -> bool {
        self.uids.contains(uid)
    }

    /// Adds a unique id; returns false if it was already known.
    pub fn insert(&mut self, uid: impl Into<UniqueId>) -> bool {
        self.uids.insert(uid.into())
    }

    /// Number of known ids.
    #[must_use]
    pub fn len(&self) -> usize {
        self.uids.len()
    }

    /// Returns true if no id is known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.uids.is_empty()
    }

    /// Iterates over the ids in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &UniqueId> {
        self.uids.iter()
    }
}

impl<T: Into<UniqueId>> FromIterator<T> for KnownUids {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            uids: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl<T: Into<UniqueId>> Extend<T> for KnownUids {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.uids.extend(iter.into_iter().map(Into::into));
    }
}

impl Serialize for KnownUids {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.uids.iter().map(UniqueId::as_str))
    }
}

impl<'de> Deserialize<'de> for KnownUids {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Vec::<String>::deserialize(deserializer)?.into_iter().collect())
    }
}

/// Decoded messages keyed by unique id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchResult {
    messages: BTreeMap<UniqueId, ParsedMessage>,
}

impl FetchResult {
    /// Creates an empty result.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a decoded message.
    pub fn insert(&mut self, uid: UniqueId, message: ParsedMessage) {
        self.messages.insert(uid, message);
    }

    /// Looks up a message by unique id.
    #[must_use]
    pub fn get(&self, uid: &str) -> Option<&ParsedMessage> {
        self.messages.get(uid)
    }

    /// Number of messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns true if nothing was fetched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Iterates over the unique ids.
    pub fn uids(&self) -> impl Iterator<Item = &UniqueId> {
        self.messages.keys()
    }

    /// Iterates over the messages, ordered by unique id.
    pub fn iter(&self) -> impl Iterator<Item = (&UniqueId, &ParsedMessage)> {
        self.messages.iter()
    }
}

impl IntoIterator for FetchResult {
    type Item = (UniqueId, ParsedMessage);
    type IntoIter = std::collections::btree_map::IntoIter<UniqueId, ParsedMessage>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.into_iter()
    }
}

impl Serialize for FetchResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.messages.len()))?;
        for (uid, message) in &self.messages {
            map.serialize_entry(uid.as_str(), message)?;
        }
        map.end()
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
    use proptest::prelude::*;

    fn number(n: u32) -> MessageNumber {
        MessageNumber::new(n).unwrap()
    }

    fn index(entries: &[(u32, &str)]) -> UidIndex {
        entries
            .iter()
            .map(|(n, uid)| (number(*n), UniqueId::from(*uid)))
            .collect()
    }

    #[test]
    fn test_without_removes_known() {
        let listed = index(&[(1, "a"), (2, "b"), (3, "c")]);
        let known: KnownUids = ["b", "zz"].into_iter().collect();

        let new = listed.without(&known);
        assert_eq!(new, index(&[(1, "a"), (3, "c")]));
    }

    #[test]
    fn test_without_empty_known_is_identity() {
        let listed = index(&[(1, "a"), (2, "b")]);
        assert_eq!(listed.without(&KnownUids::new()), listed);
    }

    #[test]
    fn test_duplicate_uid_keeps_first_number() {
        let listed = index(&[(1, "a"), (2, "a")]);
        assert_eq!(listed.len(), 1);
        assert_eq!(listed.get("a"), Some(number(1)));
    }

    #[test]
    fn test_by_number_is_ascending() {
        let listed = index(&[(3, "a"), (1, "c"), (2, "b")]);
        let numbers: Vec<u32> = listed.by_number().iter().map(|(n, _)| n.get()).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[test]
    fn test_known_uids_json() {
        let known: KnownUids = serde_json::from_str(r#"["b", "a", "b"]"#).unwrap();
        assert_eq!(known.len(), 2);
        assert_eq!(serde_json::to_string(&known).unwrap(), r#"["a","b"]"#);
    }

    #[test]
    fn test_known_uids_from_strings() {
        let known: KnownUids = vec![String::from("x"), String::from("y")].into_iter().collect();
        assert!(known.contains("x"));
        assert!(!known.contains("z"));
    }

    #[test]
    fn test_fetch_result_json_keyed_by_uid() {
        let mut result = FetchResult::new();
        result.insert(
            UniqueId::from("uid-1"),
            popledger_mime::parse(b"Subject: hi\r\n\r\nhello"),
        );

        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["uid-1"]["Subject"], "hi");
        assert_eq!(value["uid-1"]["Body"][0]["data"], "hello");
    }

    proptest! {
        #[test]
        fn without_is_set_difference(
            listed in proptest::collection::btree_map("[a-z]{1,4}", 1u32..1000, 0..30),
            known in proptest::collection::btree_set("[a-z]{1,4}", 0..30),
        ) {
            let index: UidIndex = listed
                .iter()
                .map(|(uid, n)| (number(*n), UniqueId::from(uid.as_str())))
                .collect();
            let known_uids: KnownUids = known.iter().map(String::as_str).collect();

            let new = index.without(&known_uids);

            for (uid, n) in &listed {
                if known.contains(uid) {
                    prop_assert!(!new.contains(uid));
                } else {
                    prop_assert_eq!(new.get(uid), Some(number(*n)));
                }
            }
            prop_assert_eq!(new.len(), listed.keys().filter(|uid| !known.contains(*uid)).count());
        }
    }
}
