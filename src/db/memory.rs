// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process document store.
//!
//! Behaves like the remote stores (versioned, conditional writes) but keeps
//! the document in memory. Used for local development and tests.

use super::{DocumentStore, StoreError, StoredDocument, VersionToken};
use async_trait::async_trait;
use std::sync::Mutex;

#[derive(Default)]
struct MemoryState {
    current: Option<StoredDocument>,
    /// Number of committed writes and deletes
    revisions: u64,
}

/// Versioned in-memory document.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    /// An empty store (no document).
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds `content`.
    pub fn with_document(content: impl Into<Vec<u8>>) -> Self {
        let store = Self::new();
        {
            let mut state = store.lock();
            state.revisions = 1;
            state.current = Some(StoredDocument {
                content: content.into(),
                version: revision_token(1),
            });
        }
        store
    }

    /// Number of successful writes and deletes so far.
    pub fn revisions(&self) -> u64 {
        self.lock().revisions
    }

    /// Current document bytes, if any.
    pub fn content(&self) -> Option<Vec<u8>> {
        self.lock().current.as_ref().map(|doc| doc.content.clone())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        // The state is always left consistent, so a poisoned lock is still usable
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn revision_token(revision: u64) -> VersionToken {
    VersionToken::new(format!("rev-{}", revision))
}

fn matches_current(current: Option<&StoredDocument>, version: Option<&VersionToken>) -> bool {
    match (current, version) {
        (None, None) => true,
        (Some(doc), Some(version)) => doc.version == *version,
        _ => false,
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn fetch_document(&self) -> Result<Option<StoredDocument>, StoreError> {
        Ok(self.lock().current.clone())
    }

    async fn write_document(
        &self,
        content: &[u8],
        version: Option<&VersionToken>,
        message: &str,
    ) -> Result<VersionToken, StoreError> {
        let mut state = self.lock();
        if !matches_current(state.current.as_ref(), version) {
            return Err(StoreError::Conflict);
        }

        state.revisions += 1;
        let token = revision_token(state.revisions);
        state.current = Some(StoredDocument {
            content: content.to_vec(),
            version: token.clone(),
        });
        tracing::debug!(version = %token, commit_message = message, "Memory document written");
        Ok(token)
    }

    async fn delete_document(
        &self,
        version: &VersionToken,
        message: &str,
    ) -> Result<(), StoreError> {
        let mut state = self.lock();
        if !matches_current(state.current.as_ref(), Some(version)) {
            return Err(StoreError::Conflict);
        }

        state.revisions += 1;
        state.current = None;
        tracing::debug!(commit_message = message, "Memory document deleted");
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
