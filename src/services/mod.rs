// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod user_data;

pub use user_data::{MutationOutcome, Snapshot, UserDataService};
