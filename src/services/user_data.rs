// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User data service: reads and read-modify-write cycles on the users document.
//!
//! Every request starts from a fresh read. Mutations follow this sequence:
//! 1. Fetch the document and its version token
//! 2. Decode and apply the change in memory
//! 3. Write back, conditional on the token from step 1
//! 4. On a version conflict, back off and start again from step 1
//!
//! Retrying from a fresh read (never from the stale copy) is what keeps a
//! concurrent writer's change from being overwritten.

use crate::config::RetryConfig;
use crate::db::codec::{self, DecodeStatus};
use crate::db::{DocumentStore, StoreError, VersionToken};
use crate::error::{AppError, Result};
use crate::models::{aggregate, Collection, LeaderboardEntry, UpsertOutcome, UserRecord};
use crate::time_utils::format_utc_rfc3339;
use std::sync::Arc;

/// The decoded document plus the token needed to update it.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub collection: Collection,
    pub version: Option<VersionToken>,
    pub status: DecodeStatus,
}

/// What a mutation ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    Created,
    Replaced,
    Removed,
    /// Nothing to change; no write was made
    Unchanged,
}

/// A single user change, re-applied on every attempt.
enum Mutation<'a> {
    Upsert(&'a UserRecord),
    Remove(&'a str),
}

impl Mutation<'_> {
    fn username(&self) -> &str {
        match self {
            Mutation::Upsert(record) => &record.username,
            Mutation::Remove(username) => username,
        }
    }

    fn apply(&self, collection: &mut Collection, now: &str) -> MutationOutcome {
        match self {
            Mutation::Upsert(record) => match collection.upsert((*record).clone(), now) {
                UpsertOutcome::Created => MutationOutcome::Created,
                UpsertOutcome::Replaced => MutationOutcome::Replaced,
            },
            Mutation::Remove(username) => {
                if collection.remove(username) {
                    MutationOutcome::Removed
                } else {
                    MutationOutcome::Unchanged
                }
            }
        }
    }

    fn commit_message(&self) -> String {
        match self {
            Mutation::Upsert(record) => format!("Update data for {}", record.username),
            Mutation::Remove(username) => format!("Remove data for {}", username),
        }
    }
}

/// Reads and updates user records in the shared document.
#[derive(Clone)]
pub struct UserDataService {
    store: Arc<dyn DocumentStore>,
    retry: RetryConfig,
}

impl UserDataService {
    pub fn new(store: Arc<dyn DocumentStore>, retry: RetryConfig) -> Self {
        Self { store, retry }
    }

    /// Fetch and decode the current document. Store errors propagate.
    pub async fn load(&self) -> std::result::Result<Snapshot, StoreError> {
        let document = self.store.fetch_document().await?;

        let (decoded, version) = match document {
            Some(doc) => (codec::decode(Some(&doc.content)), Some(doc.version)),
            None => (codec::decode(None), None),
        };

        Ok(Snapshot {
            collection: decoded.collection,
            version,
            status: decoded.status,
        })
    }

    /// Collection for read-only requests.
    ///
    /// A failing store degrades to an empty collection so read paths stay up.
    async fn load_for_read(&self) -> Collection {
        match self.load().await {
            Ok(snapshot) => {
                if !matches!(snapshot.status, DecodeStatus::Clean | DecodeStatus::Missing) {
                    tracing::warn!(
                        status = ?snapshot.status,
                        users = snapshot.collection.len(),
                        "Serving partially decoded users document"
                    );
                }
                snapshot.collection
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    store = %self.store.describe(),
                    "Failed to load users document, serving empty data"
                );
                Collection::new()
            }
        }
    }

    /// Ranked leaderboard of all users.
    pub async fn leaderboard(&self) -> Vec<LeaderboardEntry> {
        let collection = self.load_for_read().await;
        let entries = aggregate(&collection);
        tracing::debug!(users = entries.len(), "Leaderboard computed");
        entries
    }

    /// A single user's record, if present.
    pub async fn get_user(&self, username: &str) -> Option<UserRecord> {
        let collection = self.load_for_read().await;
        collection.get(username).cloned()
    }

    /// Every record, in stored order.
    pub async fn list_users(&self) -> Vec<UserRecord> {
        self.load_for_read().await.into_iter().collect()
    }

    /// Create or wholesale-replace a user's record.
    pub async fn save_user(&self, record: UserRecord) -> Result<MutationOutcome> {
        if record.username.is_empty() {
            return Err(AppError::BadRequest("Username required".to_string()));
        }
        self.mutate(Mutation::Upsert(&record)).await
    }

    /// Remove a user's record. Removing an unknown user is not an error.
    pub async fn delete_user(&self, username: &str) -> Result<MutationOutcome> {
        if username.is_empty() {
            return Err(AppError::BadRequest("Username required".to_string()));
        }
        self.mutate(Mutation::Remove(username)).await
    }

    async fn mutate(&self, mutation: Mutation<'_>) -> Result<MutationOutcome> {
        let max_attempts = self.retry.max_attempts.max(1);
        let message = mutation.commit_message();

        for attempt in 1..=max_attempts {
            let snapshot = self.load().await?;
            if snapshot.status.is_lossy() {
                tracing::error!(
                    status = ?snapshot.status,
                    username = mutation.username(),
                    "Users document unreadable; it will be replaced on write"
                );
            }

            let mut collection = snapshot.collection;
            let now = format_utc_rfc3339(chrono::Utc::now());
            let outcome = mutation.apply(&mut collection, &now);

            if outcome == MutationOutcome::Unchanged {
                tracing::debug!(username = mutation.username(), "Nothing to change");
                return Ok(outcome);
            }

            // Removing the last user writes `[]`; the document is never deleted
            let content = codec::encode(&collection)
                .map_err(|e| AppError::Internal(anyhow::anyhow!("Encode failed: {}", e)))?;
            let result = self
                .store
                .write_document(&content, snapshot.version.as_ref(), &message)
                .await
                .map(|_| ());

            match result {
                Ok(()) => {
                    tracing::info!(
                        username = mutation.username(),
                        outcome = ?outcome,
                        attempt,
                        users = collection.len(),
                        "User data saved"
                    );
                    return Ok(outcome);
                }
                Err(StoreError::Conflict) => {
                    tracing::warn!(
                        username = mutation.username(),
                        attempt,
                        max_attempts,
                        "Version conflict, retrying from a fresh read"
                    );
                    if attempt < max_attempts {
                        let delay = self.retry.base_backoff * 2u32.saturating_pow(attempt - 1);
                        tokio::time::sleep(delay).await;
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(AppError::Conflict(format!(
            "Document kept changing; gave up after {} attempts",
            max_attempts
        )))
    }
}
