// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod collection;
pub mod leaderboard;
pub mod user;

pub use collection::{Collection, UpsertOutcome};
pub use leaderboard::{aggregate, LeaderboardEntry};
pub use user::{HistoryEntry, UserRecord};
