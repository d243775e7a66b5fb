// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Sport-Tracker: per-user fitness records and a shared leaderboard
//!
//! All user records live in a single versioned JSON document (a file in a
//! GitHub repository by default). This crate provides the HTTP API that reads
//! it, updates it with optimistic concurrency, and ranks users.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use services::UserDataService;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub users: UserDataService,
}
