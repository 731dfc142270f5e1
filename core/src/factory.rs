//! Builds `GitHubClient` values from credentials and a transport.

use secrecy::ExposeSecret;
use tracing::debug;

use crate::client::GitHubClient;
use crate::credentials::{AuthMethod, Credentials};
use crate::error::ApiError;
use crate::http::Transport;
use crate::protocol::GitHubProtocol;

pub struct GitHubClientFactory;

impl GitHubClientFactory {
    /// Validate `credentials` and bind them to `transport`.
    ///
    /// Fails with `ApiError::Configuration` when the endpoint is not an
    /// absolute http(s) URL, when owner or repository is empty, or when the
    /// auth method has an empty username or secret.
    pub fn create<T: Transport>(credentials: Credentials, transport: T) -> Result<GitHubClient<T>, ApiError> {
        validate(&credentials)?;
        let protocol = GitHubProtocol::new(credentials)?;
        debug!(
            endpoint = protocol.credentials().endpoint(),
            owner = protocol.credentials().owner(),
            repository = protocol.credentials().repository(),
            "created commit-status client"
        );
        Ok(GitHubClient::new(protocol, transport))
    }
}

fn validate(credentials: &Credentials) -> Result<(), ApiError> {
    if credentials.endpoint().trim().is_empty() {
        return Err(ApiError::Configuration("endpoint must not be empty".to_string()));
    }
    if credentials.owner().trim().is_empty() {
        return Err(ApiError::Configuration("owner must not be empty".to_string()));
    }
    if credentials.repository().trim().is_empty() {
        return Err(ApiError::Configuration("repository must not be empty".to_string()));
    }
    match credentials.auth() {
        AuthMethod::Basic { username, secret } => {
            if username.trim().is_empty() {
                return Err(ApiError::Configuration("basic auth username must not be empty".to_string()));
            }
            if secret.expose_secret().is_empty() {
                return Err(ApiError::Configuration("basic auth secret must not be empty".to_string()));
            }
        }
        AuthMethod::Token { secret } => {
            if secret.expose_secret().is_empty() {
                return Err(ApiError::Configuration("token must not be empty".to_string()));
            }
        }
    }
    Ok(())
}
