// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Local file document store.
//!
//! Intended for single-instance deployments where the document may live in
//! ephemeral storage such as `/tmp`. The version token is the SHA-256 of the
//! file contents, so edits made outside this process are detected too.

use super::{DocumentStore, StoreError, StoredDocument, VersionToken};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// JSON document on the local filesystem.
pub struct FileStore {
    path: PathBuf,
    /// Serializes compare-and-swap within this process
    write_lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    async fn read_current(&self) -> Result<Option<StoredDocument>, StoreError> {
        match tokio::fs::read(&self.path).await {
            Ok(content) => {
                let version = content_token(&content);
                Ok(Some(StoredDocument { content, version }))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(&self.path, e)),
        }
    }

    async fn check_version(&self, version: Option<&VersionToken>) -> Result<(), StoreError> {
        let current = self.read_current().await?;
        let matches = match (current.as_ref(), version) {
            (None, None) => true,
            (Some(doc), Some(version)) => doc.version == *version,
            _ => false,
        };
        if matches {
            Ok(())
        } else {
            Err(StoreError::Conflict)
        }
    }
}

fn content_token(content: &[u8]) -> VersionToken {
    VersionToken::new(hex::encode(Sha256::digest(content)))
}

fn io_error(path: &Path, e: std::io::Error) -> StoreError {
    StoreError::Unavailable(format!("{}: {}", path.display(), e))
}

#[async_trait]
impl DocumentStore for FileStore {
    async fn fetch_document(&self) -> Result<Option<StoredDocument>, StoreError> {
        self.read_current().await
    }

    async fn write_document(
        &self,
        content: &[u8],
        version: Option<&VersionToken>,
        message: &str,
    ) -> Result<VersionToken, StoreError> {
        let _guard = self.write_lock.lock().await;
        self.check_version(version).await?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(parent, e))?;
        }

        // Write-then-rename so readers never see a half-written document
        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, content)
            .await
            .map_err(|e| io_error(&tmp_path, e))?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|e| io_error(&self.path, e))?;

        let token = content_token(content);
        tracing::debug!(
            path = %self.path.display(),
            version = %token,
            commit_message = message,
            "Local document written"
        );
        Ok(token)
    }

    async fn delete_document(
        &self,
        version: &VersionToken,
        message: &str,
    ) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        self.check_version(Some(version)).await?;

        tokio::fs::remove_file(&self.path)
            .await
            .map_err(|e| io_error(&self.path, e))?;

        tracing::debug!(path = %self.path.display(), commit_message = message, "Local document deleted");
        Ok(())
    }

    fn describe(&self) -> String {
        format!("file:{}", self.path.display())
    }
}
