// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Configuration is read once at startup and handed to the store and the
//! sync service explicitly; nothing below `main` reads the environment.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_API_URL: &str = "https://api.github.com";
const DEFAULT_BRANCH: &str = "main";
const DEFAULT_DATA_FILE: &str = "data/users.json";
const DEFAULT_LOCAL_DATA_FILE: &str = "/tmp/users.json";

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,
    /// Where the users document lives
    pub backend: StorageBackend,
    /// Read-modify-write retry policy for version conflicts
    pub retry: RetryConfig,
    /// Per-request timeout for store calls
    pub store_timeout: Duration,
}

/// Backing store for the users document.
#[derive(Debug, Clone)]
pub enum StorageBackend {
    /// A file in a GitHub repository, via the contents API
    Github(GithubConfig),
    /// A local (usually ephemeral) JSON file
    File(PathBuf),
    /// In-process only; lost on restart
    Memory,
}

/// Location of and credentials for the GitHub-hosted document.
#[derive(Clone)]
pub struct GithubConfig {
    pub api_url: String,
    pub owner: String,
    pub repo: String,
    pub branch: String,
    /// Path of the document inside the repository
    pub path: String,
    pub token: String,
}

// Keep the token out of logs.
impl std::fmt::Debug for GithubConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GithubConfig")
            .field("api_url", &self.api_url)
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("branch", &self.branch)
            .field("path", &self.path)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Bounded retry for conflicting writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Total read-modify-write attempts, including the first
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles after each further conflict
    pub base_backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff: Duration::from_millis(200),
        }
    }
}

impl Config {
    /// Config for tests: in-memory store, no backoff delay.
    pub fn test_default() -> Self {
        Self {
            port: 8080,
            backend: StorageBackend::Memory,
            retry: RetryConfig {
                max_attempts: 3,
                base_backoff: Duration::ZERO,
            },
            store_timeout: Duration::from_secs(10),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// A `.env` file is loaded first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let required = |key: &'static str| var(key).ok_or(ConfigError::Missing(key));

        let backend = match var("STORAGE_BACKEND")
            .unwrap_or_else(|| "github".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "github" => StorageBackend::Github(GithubConfig {
                api_url: var("GITHUB_API_URL")
                    .unwrap_or_else(|| DEFAULT_API_URL.to_string())
                    .trim_end_matches('/')
                    .to_string(),
                owner: required("GITHUB_OWNER")?,
                repo: required("GITHUB_REPO")?,
                branch: var("GITHUB_BRANCH").unwrap_or_else(|| DEFAULT_BRANCH.to_string()),
                path: var("DATA_FILE").unwrap_or_else(|| DEFAULT_DATA_FILE.to_string()),
                token: required("GITHUB_TOKEN")?,
            }),
            "file" => StorageBackend::File(PathBuf::from(
                var("LOCAL_DATA_FILE").unwrap_or_else(|| DEFAULT_LOCAL_DATA_FILE.to_string()),
            )),
            "memory" => StorageBackend::Memory,
            other => {
                return Err(ConfigError::Invalid {
                    key: "STORAGE_BACKEND",
                    value: other.to_string(),
                })
            }
        };

        let defaults = RetryConfig::default();
        let max_attempts: u32 = parse_or(&var, "WRITE_MAX_ATTEMPTS", defaults.max_attempts)?;
        if max_attempts == 0 {
            return Err(ConfigError::Invalid {
                key: "WRITE_MAX_ATTEMPTS",
                value: "0".to_string(),
            });
        }
        let backoff_ms: u64 = parse_or(
            &var,
            "WRITE_RETRY_BACKOFF_MS",
            defaults.base_backoff.as_millis() as u64,
        )?;
        let timeout_secs: u64 = parse_or(&var, "STORE_TIMEOUT_SECS", 10)?;

        Ok(Self {
            port: parse_or(&var, "PORT", 8080)?,
            backend,
            retry: RetryConfig {
                max_attempts,
                base_backoff: Duration::from_millis(backoff_ms),
            },
            store_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

fn parse_or<T, V>(var: &V, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    V: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid { key, value: raw }),
        None => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_github_config_from_env() {
        let config = Config::from_lookup(lookup(&[
            ("GITHUB_TOKEN", " ghp_test \n"),
            ("GITHUB_OWNER", "Tinel25"),
            ("GITHUB_REPO", "Sport"),
        ]))
        .expect("Config should load");

        assert_eq!(config.port, 8080);
        assert_eq!(config.retry, RetryConfig::default());
        assert_eq!(config.store_timeout, Duration::from_secs(10));

        let StorageBackend::Github(github) = config.backend else {
            panic!("expected github backend");
        };
        assert_eq!(github.api_url, "https://api.github.com");
        assert_eq!(github.branch, "main");
        assert_eq!(github.path, "data/users.json");
        assert_eq!(github.token, "ghp_test");
        assert!(!format!("{:?}", github).contains("ghp_test"));
    }

    #[test]
    fn test_github_requires_credentials() {
        let err = Config::from_lookup(lookup(&[("GITHUB_OWNER", "o"), ("GITHUB_REPO", "r")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Missing("GITHUB_TOKEN")));
    }

    #[test]
    fn test_file_backend_and_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("STORAGE_BACKEND", "File"),
            ("LOCAL_DATA_FILE", "/var/tmp/sport.json"),
            ("PORT", "9000"),
            ("WRITE_MAX_ATTEMPTS", "5"),
            ("WRITE_RETRY_BACKOFF_MS", "50"),
        ]))
        .unwrap();

        assert_eq!(config.port, 9000);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.base_backoff, Duration::from_millis(50));
        assert!(matches!(
            config.backend,
            StorageBackend::File(ref p) if p == &PathBuf::from("/var/tmp/sport.json")
        ));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = Config::from_lookup(lookup(&[
            ("STORAGE_BACKEND", "memory"),
            ("PORT", "eighty"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "PORT", .. }));

        let err = Config::from_lookup(lookup(&[("STORAGE_BACKEND", "s3")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "STORAGE_BACKEND", .. }));

        let err = Config::from_lookup(lookup(&[
            ("STORAGE_BACKEND", "memory"),
            ("WRITE_MAX_ATTEMPTS", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "WRITE_MAX_ATTEMPTS", .. }));
    }
}
