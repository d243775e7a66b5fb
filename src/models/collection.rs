// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! The full set of user records held in the shared document.
//!
//! A `Collection` is rebuilt from the store on every request and mutated in
//! memory before being written back, so all operations here are pure.
//!
//! Stored entries that cannot be read as a [`UserRecord`] are kept verbatim
//! alongside the records, so writing the collection back never loses them.

use crate::models::UserRecord;
use serde_json::Value;

/// Ordered, username-unique list of user records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Collection {
    users: Vec<UserRecord>,
    /// Unreadable or duplicate stored entries, written back untouched
    retained: Vec<Value>,
}

/// What an upsert did to the collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Replaced,
}

impl Collection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a record by exact username.
    pub fn get(&self, username: &str) -> Option<&UserRecord> {
        self.users.iter().find(|u| u.username == username)
    }

    /// All records in collection order.
    pub fn list(&self) -> &[UserRecord] {
        &self.users
    }

    pub fn iter(&self) -> impl Iterator<Item = &UserRecord> {
        self.users.iter()
    }

    /// Stored entries that are not usable records, in stored order.
    pub fn retained(&self) -> &[Value] {
        &self.retained
    }

    /// Number of user records (retained entries not included).
    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Insert or wholesale-replace the record for `record.username`.
    ///
    /// The stored record is exactly `record` with `last_update` set to `now`;
    /// nothing from a previous record for the same user is kept. A replaced
    /// record keeps its position, a new one is appended.
    pub fn upsert(&mut self, mut record: UserRecord, now: &str) -> UpsertOutcome {
        record.last_update = Some(now.to_string());
        self.retained
            .retain(|entry| entry_username(entry) != Some(record.username.as_str()));

        match self.users.iter().position(|u| u.username == record.username) {
            Some(index) => {
                self.users[index] = record;
                UpsertOutcome::Replaced
            }
            None => {
                self.users.push(record);
                UpsertOutcome::Created
            }
        }
    }

    /// Remove the record for `username`, along with any retained entry
    /// stored under that name.
    ///
    /// Returns `false` if there was nothing to remove.
    pub fn remove(&mut self, username: &str) -> bool {
        let before = self.users.len() + self.retained.len();
        self.users.retain(|u| u.username != username);
        self.retained
            .retain(|entry| entry_username(entry) != Some(username));
        self.users.len() + self.retained.len() != before
    }

    /// Append a decoded record unless its username is already present.
    ///
    /// Returns `false` for a duplicate, which is left out.
    pub(crate) fn push_unique(&mut self, record: UserRecord) -> bool {
        if self.get(&record.username).is_some() {
            return false;
        }
        self.users.push(record);
        true
    }

    /// Keep a stored entry that is not a usable record.
    pub(crate) fn retain_raw(&mut self, entry: Value) {
        self.retained.push(entry);
    }
}

/// The `username` of a raw stored entry, if it has a string one.
fn entry_username(entry: &Value) -> Option<&str> {
    entry.get("username").and_then(Value::as_str)
}

impl IntoIterator for Collection {
    type Item = UserRecord;
    type IntoIter = std::vec::IntoIter<UserRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.users.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const NOW: &str = "2025-01-15T12:00:00.000Z";

    fn record_with_target(username: &str, exercise: &str, goal: u32) -> UserRecord {
        let mut record = UserRecord::new(username);
        record.targets.insert(exercise.to_string(), json!(goal));
        record
    }

    #[test]
    fn test_upsert_creates_then_replaces() {
        let mut collection = Collection::new();

        let outcome = collection.upsert(record_with_target("alice", "pushups", 10), NOW);
        assert_eq!(outcome, UpsertOutcome::Created);
        assert_eq!(collection.len(), 1);

        let outcome = collection.upsert(record_with_target("alice", "squats", 20), NOW);
        assert_eq!(outcome, UpsertOutcome::Replaced);
        assert_eq!(collection.len(), 1);

        // Wholesale replace: the old target is gone
        let alice = collection.get("alice").unwrap();
        assert_eq!(alice.targets.get("pushups"), None);
        assert_eq!(alice.targets.get("squats"), Some(&json!(20)));
        assert_eq!(alice.last_update.as_deref(), Some(NOW));
    }

    #[test]
    fn test_upsert_keeps_position() {
        let mut collection = Collection::new();
        collection.upsert(UserRecord::new("a"), NOW);
        collection.upsert(UserRecord::new("b"), NOW);
        collection.upsert(UserRecord::new("c"), NOW);

        collection.upsert(record_with_target("b", "run", 5), NOW);

        let names: Vec<&str> = collection.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let record = record_with_target("alice", "pushups", 10);

        let mut once = Collection::new();
        once.upsert(record.clone(), NOW);

        let mut twice = Collection::new();
        twice.upsert(record.clone(), NOW);
        twice.upsert(record, NOW);

        assert_eq!(once, twice);
    }

    #[test]
    fn test_username_match_is_case_sensitive() {
        let mut collection = Collection::new();
        collection.upsert(UserRecord::new("Alice"), NOW);

        assert!(collection.get("alice").is_none());
        assert!(!collection.remove("alice"));

        collection.upsert(UserRecord::new("alice"), NOW);
        assert_eq!(collection.len(), 2);
    }

    #[test]
    fn test_remove_then_get() {
        let mut collection = Collection::new();
        collection.upsert(UserRecord::new("alice"), NOW);
        collection.upsert(UserRecord::new("bob"), NOW);

        assert!(collection.remove("alice"));
        assert!(collection.get("alice").is_none());
        assert_eq!(collection.len(), 1);

        // Second removal is a no-op
        let before = collection.clone();
        assert!(!collection.remove("alice"));
        assert_eq!(collection, before);
    }

    #[test]
    fn test_retained_entries_follow_their_username() {
        let mut collection = Collection::new();
        collection.upsert(UserRecord::new("alice"), NOW);
        collection.retain_raw(json!({ "username": "bob", "history": "corrupt" }));
        collection.retain_raw(json!({ "username": "carol", "targets": [1, 2] }));
        collection.retain_raw(json!("not a record"));

        assert_eq!(collection.len(), 1);
        assert!(collection.get("bob").is_none());

        // Deleting a user also drops their unreadable entry
        assert!(collection.remove("bob"));
        assert_eq!(collection.retained().len(), 2);

        // Saving a user replaces their unreadable entry
        collection.upsert(UserRecord::new("carol"), NOW);
        assert_eq!(collection.retained(), &[json!("not a record")]);
        assert_eq!(collection.len(), 2);

        assert!(!collection.remove("dave"));
    }

    #[test]
    fn test_push_unique_rejects_duplicates() {
        let mut collection = Collection::new();
        assert!(collection.push_unique(record_with_target("alice", "pushups", 1)));
        assert!(!collection.push_unique(record_with_target("alice", "pushups", 2)));

        assert_eq!(
            collection.get("alice").unwrap().targets.get("pushups"),
            Some(&json!(1))
        );
    }
}
