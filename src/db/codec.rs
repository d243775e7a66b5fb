// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Conversion between the stored users document and a [`Collection`].
//!
//! Decoding never fails: a missing or unreadable document yields an empty
//! collection together with a [`DecodeStatus`] saying why, so callers can
//! decide how loudly to complain.
//!
//! Accepted shapes:
//! - `[ {username, ...}, ... ]` (canonical, always written back)
//! - `{ "users": { "<username>": {...}, ... } }`
//! - `{ "<username>": {...}, ... }`

use crate::models::{Collection, UserRecord};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// How faithfully the stored bytes were turned into a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeStatus {
    /// Every record was read
    Clean,
    /// No document exists yet
    Missing,
    /// The bytes are not JSON
    Malformed(String),
    /// Valid JSON, but not a users document
    ShapeMismatch(&'static str),
    /// Some entries were invalid or duplicated; they are kept verbatim in
    /// [`Collection::retained`] and written back as they were
    Partial { retained: usize },
}

impl DecodeStatus {
    /// True when stored data could not be represented in the collection, so
    /// writing the collection back would replace it.
    pub fn is_lossy(&self) -> bool {
        matches!(
            self,
            DecodeStatus::Malformed(_) | DecodeStatus::ShapeMismatch(_)
        )
    }
}

/// Result of decoding a document.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub collection: Collection,
    pub status: DecodeStatus,
}

impl Decoded {
    fn empty(status: DecodeStatus) -> Self {
        Self {
            collection: Collection::new(),
            status,
        }
    }
}

/// Decode the raw document, if any.
pub fn decode(raw: Option<&[u8]>) -> Decoded {
    let Some(raw) = raw else {
        return Decoded::empty(DecodeStatus::Missing);
    };

    // An empty file is the same as no file
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Decoded::empty(DecodeStatus::Missing);
    }

    let value: Value = match serde_json::from_slice(raw) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(error = %e, bytes = raw.len(), "Users document is not valid JSON");
            return Decoded::empty(DecodeStatus::Malformed(e.to_string()));
        }
    };

    match value {
        Value::Array(items) => from_entries(items.into_iter().map(|item| (None, item))),
        Value::Object(mut map) => {
            if map.len() == 1 && map.get("users").is_some_and(Value::is_object) {
                if let Some(Value::Object(users)) = map.remove("users") {
                    return from_keyed(users);
                }
            }
            if map.values().all(Value::is_object) {
                from_keyed(map)
            } else {
                tracing::warn!("Users document is an object without per-user entries");
                Decoded::empty(DecodeStatus::ShapeMismatch("object with non-record values"))
            }
        }
        other => {
            tracing::warn!(kind = json_kind(&other), "Users document has unexpected type");
            Decoded::empty(DecodeStatus::ShapeMismatch(json_kind(&other)))
        }
    }
}

/// One element of the encoded array.
#[derive(Serialize)]
#[serde(untagged)]
enum Entry<'a> {
    Record(&'a UserRecord),
    Raw(&'a Value),
}

/// Encode the collection as an indented JSON array with a trailing newline.
///
/// Records come first, followed by retained entries unchanged.
pub fn encode(collection: &Collection) -> Result<Vec<u8>, serde_json::Error> {
    let entries: Vec<Entry<'_>> = collection
        .iter()
        .map(Entry::Record)
        .chain(collection.retained().iter().map(Entry::Raw))
        .collect();

    let mut bytes = serde_json::to_vec_pretty(&entries)?;
    bytes.push(b'\n');
    Ok(bytes)
}

fn from_keyed(map: Map<String, Value>) -> Decoded {
    from_entries(map.into_iter().map(|(key, item)| (Some(key), item)))
}

fn from_entries<I>(entries: I) -> Decoded
where
    I: Iterator<Item = (Option<String>, Value)>,
{
    let mut collection = Collection::new();
    let mut retained = 0;

    for (key, mut item) in entries {
        // In the keyed shapes the map key is the username
        if let (Some(key), Value::Object(fields)) = (key, &mut item) {
            fields
                .entry("username")
                .or_insert_with(|| Value::String(key));
        }

        let usable = match UserRecord::deserialize(&item) {
            Ok(record) if record.username.is_empty() => {
                tracing::warn!("Keeping stored record with empty username as is");
                false
            }
            Ok(record) => {
                let username = record.username.clone();
                let unique = collection.push_unique(record);
                if !unique {
                    tracing::warn!(username = %username, "Keeping duplicate stored record as is");
                }
                unique
            }
            Err(e) => {
                tracing::warn!(error = %e, "Keeping unreadable stored record as is");
                false
            }
        };

        if !usable {
            collection.retain_raw(item);
            retained += 1;
        }
    }

    let status = if retained == 0 {
        DecodeStatus::Clean
    } else {
        DecodeStatus::Partial { retained }
    };
    Decoded { collection, status }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
