//! Connection credentials for the hosting service.
//!
//! `Credentials` is an immutable value: endpoint, owner, repository and one
//! authentication method. The `Authorization` header is derived from it for
//! every request rather than stored on the client.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use secrecy::{ExposeSecret, SecretString};

/// How requests are authenticated.
#[derive(Debug, Clone)]
pub enum AuthMethod {
    /// HTTP Basic with a username and password (or token used as password).
    Basic { username: String, secret: SecretString },
    /// Personal access token sent as `Authorization: token <secret>`.
    Token { secret: SecretString },
}

impl AuthMethod {
    pub fn basic(username: impl Into<String>, secret: impl Into<String>) -> Self {
        AuthMethod::Basic {
            username: username.into(),
            secret: SecretString::from(secret.into()),
        }
    }

    pub fn token(secret: impl Into<String>) -> Self {
        AuthMethod::Token {
            secret: SecretString::from(secret.into()),
        }
    }

    /// Value for the `Authorization` header.
    pub fn authorization_header(&self) -> String {
        match self {
            AuthMethod::Basic { username, secret } => {
                let pair = format!("{username}:{}", secret.expose_secret());
                format!("Basic {}", STANDARD.encode(pair))
            }
            AuthMethod::Token { secret } => format!("token {}", secret.expose_secret()),
        }
    }
}

/// Endpoint, repository coordinates and auth method for one client.
#[derive(Debug, Clone)]
pub struct Credentials {
    endpoint: String,
    owner: String,
    repository: String,
    auth: AuthMethod,
}

impl Credentials {
    pub fn new(
        endpoint: impl Into<String>,
        owner: impl Into<String>,
        repository: impl Into<String>,
        auth: AuthMethod,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            owner: owner.into(),
            repository: repository.into(),
            auth,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    pub fn auth(&self) -> &AuthMethod {
        &self.auth
    }
}
