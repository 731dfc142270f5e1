//! Client configuration loaded from environment variables.
//!
//! | variable              | meaning                                   |
//! |-----------------------|-------------------------------------------|
//! | `GITHUB_API_URL`      | API root, default `https://api.github.com` |
//! | `GITHUB_OWNER`        | repository owner (defaults to username)   |
//! | `GITHUB_REPOSITORY`   | repository name                           |
//! | `GITHUB_TOKEN`        | personal access token                     |
//! | `GITHUB_USERNAME`     | basic-auth username                       |
//! | `GITHUB_PASSWORD`     | basic-auth password                       |
//! | `GITHUB_TIMEOUT_SECS` | optional transport timeout                |
//!
//! A token takes precedence over username/password. The loaded value is
//! returned to the caller; nothing is kept in process-wide state.

use std::env;
use std::time::Duration;

use crate::credentials::{AuthMethod, Credentials};
use crate::error::ApiError;
use crate::{GitHubClient, GitHubClientFactory, UreqTransport};

pub const DEFAULT_API_URL: &str = "https://api.github.com";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub credentials: Credentials,
    pub timeout: Option<Duration>,
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load from an arbitrary key/value source. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let endpoint = get("GITHUB_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let username = get("GITHUB_USERNAME");

        let auth = match (get("GITHUB_TOKEN"), &username, get("GITHUB_PASSWORD")) {
            (Some(token), _, _) => AuthMethod::token(token),
            (None, Some(user), Some(password)) => AuthMethod::basic(user.clone(), password),
            (None, Some(_), None) => return Err(ConfigError::MissingEnvVar("GITHUB_PASSWORD")),
            (None, None, _) => return Err(ConfigError::MissingEnvVar("GITHUB_TOKEN")),
        };

        let owner = get("GITHUB_OWNER")
            .or(username)
            .ok_or(ConfigError::MissingEnvVar("GITHUB_OWNER"))?;
        let repository = get("GITHUB_REPOSITORY").ok_or(ConfigError::MissingEnvVar("GITHUB_REPOSITORY"))?;

        let timeout = get("GITHUB_TIMEOUT_SECS")
            .map(|value| {
                value
                    .trim()
                    .parse::<u64>()
                    .map(Duration::from_secs)
                    .map_err(|_| ConfigError::InvalidValue("GITHUB_TIMEOUT_SECS"))
            })
            .transpose()?;

        Ok(Self {
            credentials: Credentials::new(endpoint, owner, repository, auth),
            timeout,
        })
    }

    /// Build a client over the default ureq transport.
    pub fn into_client(self) -> Result<GitHubClient<UreqTransport>, ApiError> {
        GitHubClientFactory::create(self.credentials, UreqTransport::with_timeout(self.timeout))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("invalid value for environment variable: {0}")]
    InvalidValue(&'static str),
}
