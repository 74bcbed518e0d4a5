//! Access-token capability.
//!
//! Token acquisition (device code, broker, refresh caching) lives outside
//! this crate; the resolution engine only needs something that can hand it a
//! bearer token on demand. Implementations wrap whatever auth stack the host
//! application uses.

use async_trait::async_trait;
use secrecy::SecretString;
use thiserror::Error;

/// Token acquisition failure.
#[derive(Error, Debug)]
pub enum AuthError {
    /// No silent token is available and the call was non-interactive.
    #[error("interactive sign-in required")]
    AuthRequired,

    #[error("token acquisition failed: {0}")]
    Failed(String),
}

/// Supplies bearer tokens for Graph requests.
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    /// Get an access token.
    ///
    /// With `interactive = false` implementations must never prompt the user
    /// and must fail fast with [`AuthError::AuthRequired`] when no cached or
    /// silently-refreshable token exists.
    async fn access_token(&self, interactive: bool) -> Result<SecretString, AuthError>;
}

/// Fixed-token provider for tests and embedders that manage token lifetime
/// themselves.
pub struct StaticTokenProvider {
    token: SecretString,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: SecretString::from(token.into()),
        }
    }
}

#[async_trait]
impl AccessTokenProvider for StaticTokenProvider {
    async fn access_token(&self, _interactive: bool) -> Result<SecretString, AuthError> {
        Ok(self.token.clone())
    }
}
