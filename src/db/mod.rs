// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Storage layer for the shared users document.
//!
//! All users live in one JSON document. Every backend hands out a
//! [`VersionToken`] on read and only accepts a write or delete that presents
//! the token of the current version, so concurrent writers cannot silently
//! overwrite each other.

pub mod codec;
pub mod file;
pub mod github;
pub mod memory;

pub use file::FileStore;
pub use github::GithubStore;
pub use memory::MemoryStore;

use crate::config::{Config, StorageBackend};
use async_trait::async_trait;
use std::sync::Arc;

/// Opaque identifier of one revision of the document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionToken(String);

impl VersionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for VersionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The current document and the token that guards updating it.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub content: Vec<u8>,
    pub version: VersionToken,
}

/// Store-level failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The document changed since the supplied token was read
    #[error("Document was modified concurrently (version conflict)")]
    Conflict,

    /// Network failure or timeout; the store may be fine
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Any non-success response other than not-found or a conflict
    #[error("Store returned HTTP {status}: {body}")]
    Remote { status: u16, body: String },

    /// The store answered with something we could not interpret
    #[error("Unexpected store response: {0}")]
    InvalidResponse(String),
}

/// A single versioned document with conditional updates.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read the current document. `Ok(None)` means it does not exist.
    async fn fetch_document(&self) -> Result<Option<StoredDocument>, StoreError>;

    /// Replace the document if `version` still identifies the current
    /// revision (`None`: only if no document exists). Returns the new token.
    async fn write_document(
        &self,
        content: &[u8],
        version: Option<&VersionToken>,
        message: &str,
    ) -> Result<VersionToken, StoreError>;

    /// Delete the document if `version` still identifies the current revision.
    async fn delete_document(&self, version: &VersionToken, message: &str)
        -> Result<(), StoreError>;

    /// Human-readable location, for logs.
    fn describe(&self) -> String;
}

/// Construct the store selected by configuration.
pub fn build_store(config: &Config) -> Result<Arc<dyn DocumentStore>, StoreError> {
    let store: Arc<dyn DocumentStore> = match &config.backend {
        StorageBackend::Github(github) => {
            Arc::new(GithubStore::new(github.clone(), config.store_timeout)?)
        }
        StorageBackend::File(path) => Arc::new(FileStore::new(path.clone())),
        StorageBackend::Memory => Arc::new(MemoryStore::new()),
    };
    tracing::info!(store = %store.describe(), "Document store configured");
    Ok(store)
}
