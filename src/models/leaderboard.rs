// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Leaderboard derived from the user collection.
//!
//! Entries are computed on every request and never persisted.

use serde::{Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::models::{Collection, UserRecord};

/// Largest magnitude at which every integer is exactly representable in f64.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// One ranked row of the leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub username: String,
    pub level: Option<Value>,
    /// Sum of the user's numeric targets
    #[serde(serialize_with = "serialize_score")]
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub total_score: f64,
    pub streak: u32,
    pub total_days: u32,
    /// Percentage of tracked days marked successful, 0..=100
    pub success_rate: u32,
    pub targets: BTreeMap<String, Value>,
    pub exercises: Vec<Value>,
}

impl LeaderboardEntry {
    /// Build the leaderboard row for one record.
    pub fn from_record(record: &UserRecord) -> Self {
        Self {
            username: record.username.clone(),
            level: record.level.clone(),
            total_score: record.total_score(),
            streak: record.streak,
            total_days: record.total_days,
            success_rate: success_rate(record.successful_days(), record.total_days),
            targets: record.targets.clone(),
            exercises: record.exercises.clone(),
        }
    }
}

/// Rank every user by total score, highest first.
///
/// Users with equal scores stay in collection order.
pub fn aggregate(collection: &Collection) -> Vec<LeaderboardEntry> {
    let mut entries: Vec<LeaderboardEntry> =
        collection.iter().map(LeaderboardEntry::from_record).collect();

    // Vec::sort_by is stable
    entries.sort_by(|a, b| b.total_score.total_cmp(&a.total_score));
    entries
}

/// `round(100 * successes / total_days)`, clamped to 0..=100.
fn success_rate(successes: usize, total_days: u32) -> u32 {
    if total_days == 0 {
        return 0;
    }
    let rate = (successes as f64 / total_days as f64 * 100.0).round();
    rate.clamp(0.0, 100.0) as u32
}

/// Emit integral scores as JSON integers so `10` does not become `10.0`.
fn serialize_score<S>(score: &f64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    if score.fract() == 0.0 && score.abs() <= MAX_EXACT_INTEGER {
        serializer.serialize_i64(*score as i64)
    } else {
        serializer.serialize_f64(*score)
    }
}
