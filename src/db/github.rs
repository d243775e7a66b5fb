// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! GitHub repository contents API as a document store.
//!
//! Handles:
//! - Fetching the document (base64 contents plus blob sha)
//! - Conditional create/update via `PUT` with the last seen sha
//! - Conditional delete
//! - Large files via the git blobs API
//!
//! Every write is a commit, so earlier versions stay in the repository history.

use super::{DocumentStore, StoreError, StoredDocument, VersionToken};
use crate::config::GithubConfig;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const ACCEPT: &str = "application/vnd.github+json";
const API_VERSION: &str = "2022-11-28";
const USER_AGENT: &str = concat!("sport-tracker/", env!("CARGO_PKG_VERSION"));

/// Document stored as a file in a GitHub repository.
#[derive(Clone)]
pub struct GithubStore {
    http: reqwest::Client,
    config: GithubConfig,
    contents_url: String,
}

impl GithubStore {
    /// Create a client for the configured repository file.
    pub fn new(config: GithubConfig, timeout: Duration) -> Result<Self, StoreError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| StoreError::Unavailable(format!("Failed to build HTTP client: {}", e)))?;

        let contents_url = contents_url(&config);
        Ok(Self {
            http,
            config,
            contents_url,
        })
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .bearer_auth(&self.config.token)
            .header(reqwest::header::ACCEPT, ACCEPT)
            .header("X-GitHub-Api-Version", API_VERSION)
    }

    /// Fetch a blob by sha. Used when the file is too large to be inlined
    /// in the contents response.
    async fn fetch_blob(&self, sha: &str) -> Result<Vec<u8>, StoreError> {
        let url = format!(
            "{}/repos/{}/{}/git/blobs/{}",
            self.config.api_url,
            urlencoding::encode(&self.config.owner),
            urlencoding::encode(&self.config.repo),
            sha
        );

        let response = self
            .request(reqwest::Method::GET, &url)
            .send()
            .await
            .map_err(transport_error)?;

        let blob: BlobResponse = check_response_json(response).await?;
        decode_content(&blob.content, blob.encoding.as_deref())
    }
}

/// `{api}/repos/{owner}/{repo}/contents/{path}` with each path segment escaped.
fn contents_url(config: &GithubConfig) -> String {
    let path = config
        .path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/");

    format!(
        "{}/repos/{}/{}/contents/{}",
        config.api_url,
        urlencoding::encode(&config.owner),
        urlencoding::encode(&config.repo),
        path
    )
}

/// Decode contents API base64, which is wrapped at 60 columns.
fn decode_content(content: &str, encoding: Option<&str>) -> Result<Vec<u8>, StoreError> {
    match encoding {
        Some("base64") | None => {
            let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
            BASE64
                .decode(compact)
                .map_err(|e| StoreError::InvalidResponse(format!("Invalid base64 content: {}", e)))
        }
        Some("utf-8") => Ok(content.as_bytes().to_vec()),
        Some(other) => Err(StoreError::InvalidResponse(format!(
            "Unsupported content encoding: {}",
            other
        ))),
    }
}

fn transport_error(e: reqwest::Error) -> StoreError {
    if e.is_timeout() {
        StoreError::Unavailable(format!("GitHub request timed out: {}", e))
    } else {
        StoreError::Unavailable(format!("GitHub request failed: {}", e))
    }
}

/// Map a failed write/delete status to a store error.
///
/// 409 is GitHub's "sha does not match". A 422 on a create means a file
/// appeared since we looked (GitHub wants its sha). A 404 on an update or
/// delete means the file we read has been deleted since.
fn classify_failure(status: StatusCode, body: String, had_version: bool) -> StoreError {
    match status {
        StatusCode::CONFLICT => StoreError::Conflict,
        StatusCode::UNPROCESSABLE_ENTITY if !had_version => StoreError::Conflict,
        StatusCode::NOT_FOUND if had_version => StoreError::Conflict,
        _ => StoreError::Remote {
            status: status.as_u16(),
            body,
        },
    }
}

/// Check response and parse JSON body.
async fn check_response_json<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<T, StoreError> {
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(StoreError::Remote {
            status: status.as_u16(),
            body,
        });
    }

    response
        .json()
        .await
        .map_err(|e| StoreError::InvalidResponse(format!("JSON parse error: {}", e)))
}

#[async_trait]
impl DocumentStore for GithubStore {
    async fn fetch_document(&self) -> Result<Option<StoredDocument>, StoreError> {
        tracing::debug!(url = %self.contents_url, branch = %self.config.branch, "Fetching document from GitHub");

        let response = self
            .request(reqwest::Method::GET, &self.contents_url)
            .query(&[("ref", self.config.branch.as_str())])
            .send()
            .await
            .map_err(transport_error)?;

        if response.status() == StatusCode::NOT_FOUND {
            tracing::info!(url = %self.contents_url, "Document not found on GitHub");
            return Ok(None);
        }

        let file: ContentsResponse = check_response_json(response).await?;

        let content = match file.encoding.as_deref() {
            // Over the inline size limit: contents come back empty
            Some("none") => self.fetch_blob(&file.sha).await?,
            encoding => decode_content(file.content.as_deref().unwrap_or_default(), encoding)?,
        };

        Ok(Some(StoredDocument {
            content,
            version: VersionToken::new(file.sha),
        }))
    }

    async fn write_document(
        &self,
        content: &[u8],
        version: Option<&VersionToken>,
        message: &str,
    ) -> Result<VersionToken, StoreError> {
        let body = PutRequest {
            message,
            content: BASE64.encode(content),
            branch: &self.config.branch,
            sha: version.map(VersionToken::as_str),
        };

        let response = self
            .request(reqwest::Method::PUT, &self.contents_url)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let err = classify_failure(status, text, version.is_some());
            if matches!(err, StoreError::Conflict) {
                tracing::warn!(status = status.as_u16(), "GitHub rejected write: document changed");
            }
            return Err(err);
        }

        let written: PutResponse = response
            .json()
            .await
            .map_err(|e| StoreError::InvalidResponse(format!("JSON parse error: {}", e)))?;
        let sha = written.content.map(|c| c.sha).ok_or_else(|| {
            StoreError::InvalidResponse("PUT response without content sha".to_string())
        })?;
        let commit = written
            .commit
            .map(|c| c.sha)
            .unwrap_or_else(|| "unknown".to_string());

        tracing::info!(version = %sha, commit = %commit, "Document committed to GitHub");
        Ok(VersionToken::new(sha))
    }

    async fn delete_document(
        &self,
        version: &VersionToken,
        message: &str,
    ) -> Result<(), StoreError> {
        let body = DeleteRequest {
            message,
            branch: &self.config.branch,
            sha: version.as_str(),
        };

        let response = self
            .request(reqwest::Method::DELETE, &self.contents_url)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(classify_failure(status, text, true));
        }

        tracing::info!(url = %self.contents_url, "Document deleted from GitHub");
        Ok(())
    }

    fn describe(&self) -> String {
        format!(
            "github:{}/{}@{}:{}",
            self.config.owner, self.config.repo, self.config.branch, self.config.path
        )
    }
}

/// File metadata from `GET /contents/{path}`.
#[derive(Debug, Deserialize)]
struct ContentsResponse {
    sha: String,
    content: Option<String>,
    encoding: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BlobResponse {
    content: String,
    encoding: Option<String>,
}

#[derive(Serialize)]
struct PutRequest<'a> {
    message: &'a str,
    content: String,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

#[derive(Serialize)]
struct DeleteRequest<'a> {
    message: &'a str,
    branch: &'a str,
    sha: &'a str,
}

#[derive(Debug, Deserialize)]
struct PutResponse {
    content: Option<ShaRef>,
    commit: Option<ShaRef>,
}

#[derive(Debug, Deserialize)]
struct ShaRef {
    sha: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(path: &str) -> GithubConfig {
        GithubConfig {
            api_url: "https://api.github.com".to_string(),
            owner: "Tinel25".to_string(),
            repo: "Sport".to_string(),
            branch: "main".to_string(),
            path: path.to_string(),
            token: "test-token".to_string(),
        }
    }

    #[test]
    fn test_contents_url() {
        assert_eq!(
            contents_url(&config("data/users.json")),
            "https://api.github.com/repos/Tinel25/Sport/contents/data/users.json"
        );
        assert_eq!(
            contents_url(&config("/my data/users 2.json")),
            "https://api.github.com/repos/Tinel25/Sport/contents/my%20data/users%202.json"
        );
    }

    #[test]
    fn test_decode_wrapped_base64() {
        let encoded = BASE64.encode(br#"[{"username":"alice","targets":{"pushups":10}}]"#);
        let wrapped: String = encoded
            .as_bytes()
            .chunks(20)
            .map(|chunk| format!("{}\n", std::str::from_utf8(chunk).unwrap()))
            .collect();

        let decoded = decode_content(&wrapped, Some("base64")).unwrap();
        assert_eq!(decoded, br#"[{"username":"alice","targets":{"pushups":10}}]"#);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let err = decode_content("!!not base64!!", Some("base64")).unwrap_err();
        assert!(matches!(err, StoreError::InvalidResponse(_)));

        let err = decode_content("abc", Some("rot13")).unwrap_err();
        assert!(matches!(err, StoreError::InvalidResponse(_)));
    }

    #[test]
    fn test_classify_failure() {
        assert!(matches!(
            classify_failure(StatusCode::CONFLICT, String::new(), true),
            StoreError::Conflict
        ));
        assert!(matches!(
            classify_failure(StatusCode::UNPROCESSABLE_ENTITY, String::new(), false),
            StoreError::Conflict
        ));
        assert!(matches!(
            classify_failure(StatusCode::UNPROCESSABLE_ENTITY, "bad".to_string(), true),
            StoreError::Remote { status: 422, .. }
        ));
        // The file was deleted after we read its sha
        assert!(matches!(
            classify_failure(StatusCode::NOT_FOUND, String::new(), true),
            StoreError::Conflict
        ));
        // Nothing was read, so the repository or branch itself is missing
        assert!(matches!(
            classify_failure(StatusCode::NOT_FOUND, String::new(), false),
            StoreError::Remote { status: 404, .. }
        ));
        assert!(matches!(
            classify_failure(StatusCode::UNAUTHORIZED, "Bad credentials".to_string(), true),
            StoreError::Remote { status: 401, .. }
        ));
    }

    #[test]
    fn test_put_request_omits_missing_sha() {
        let body = PutRequest {
            message: "Update user data",
            content: BASE64.encode("[]"),
            branch: "main",
            sha: None,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert!(value.get("sha").is_none());
        assert_eq!(value["content"], "W10=");
    }
}
