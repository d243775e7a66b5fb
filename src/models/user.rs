// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User record model for storage and API.
//!
//! Records come from browsers and from hand-edited documents, so numeric and
//! boolean fields are read leniently and unknown fields are carried through
//! untouched.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use validator::Validate;

/// Maximum accepted username length.
pub const MAX_USERNAME_LEN: u64 = 100;

/// A single user's tracking record, stored in the shared users document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    /// Unique key within the collection (exact, case-sensitive match)
    #[validate(length(min = 1, max = MAX_USERNAME_LEN))]
    pub username: String,
    /// Exercise identifiers or descriptors, in the order the user picked them
    #[serde(default, deserialize_with = "null_as_default")]
    pub exercises: Vec<Value>,
    /// Optional level classifier ("beginner", 2, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<Value>,
    /// Goal per exercise or category
    #[serde(default, deserialize_with = "null_as_default")]
    pub targets: BTreeMap<String, Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub exercise_stats: BTreeMap<String, Value>,
    /// Consecutive successful days
    #[serde(default, deserialize_with = "lenient_count")]
    pub streak: u32,
    /// Number of tracked days
    #[serde(default, deserialize_with = "lenient_count")]
    pub total_days: u32,
    /// Opaque marker written by the client (normally a date string)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_check_date: Option<Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub history: Vec<HistoryEntry>,
    /// Set on every write (RFC 3339)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update: Option<String>,
    /// Fields this service does not interpret
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// One tracked day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub success: bool,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl UserRecord {
    /// Create an empty record for a username.
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            exercises: Vec::new(),
            level: None,
            targets: BTreeMap::new(),
            exercise_stats: BTreeMap::new(),
            streak: 0,
            total_days: 0,
            last_check_date: None,
            history: Vec::new(),
            last_update: None,
            extra: BTreeMap::new(),
        }
    }

    /// Sum of all numeric targets. Non-numeric goals count as 0.
    pub fn total_score(&self) -> f64 {
        self.targets.values().filter_map(Value::as_f64).sum()
    }

    /// Number of history entries marked successful.
    pub fn successful_days(&self) -> usize {
        self.history.iter().filter(|h| h.success).count()
    }
}

/// Treat an explicit `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Read a non-negative count from any JSON value.
///
/// Numeric strings are parsed. Negative numbers clamp to 0, fractions
/// truncate, and anything else (including `null`) reads as 0.
fn lenient_count<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(count_from_value(&value))
}

fn count_from_value(value: &Value) -> u32 {
    match value {
        Value::Number(n) => match n.as_u64() {
            Some(u) => u.min(u32::MAX as u64) as u32,
            None => n.as_f64().map_or(0, count_from_float),
        },
        Value::String(s) => s.trim().parse::<f64>().map_or(0, count_from_float),
        _ => 0,
    }
}

fn count_from_float(f: f64) -> u32 {
    if f.is_finite() && f > 0.0 {
        f.min(u32::MAX as f64) as u32
    } else {
        0
    }
}

/// Read a success flag with JavaScript truthiness.
fn lenient_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Null => false,
        Value::Bool(b) => b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    })
}
