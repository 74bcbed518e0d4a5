//! Microsoft Graph access layer.
//!
//! The resolution engine talks to Graph exclusively through the [`GraphApi`]
//! trait so tests and embedders can substitute their own transport. The
//! shipped implementation is [`client::GraphClient`], a thin `reqwest`
//! wrapper with retry and structured error classification.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                GraphApi trait                │
//! │        get_json, get_bytes, post_json        │
//! └──────────────────────────────────────────────┘
//!                 │                    │
//!                 ▼                    ▼
//!          ┌─────────────┐     ┌──────────────┐
//!          │ GraphClient │     │  test fakes  │
//!          └─────────────┘     └──────────────┘
//! ```

pub mod auth;
pub mod client;
pub mod http_retry;

pub use auth::{AccessTokenProvider, AuthError, StaticTokenProvider};
pub use client::GraphClient;
pub use http_retry::RetryConfig;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Remote API capability consumed by the resolver and version fetcher.
///
/// Endpoints are paths relative to the fixed REST base (for example
/// `/me/drive/root:/Documents/plan.md`). The `interactive` flag is forwarded
/// to the token provider: `false` must never prompt the user.
#[async_trait]
pub trait GraphApi: Send + Sync {
    /// Authenticated GET returning the parsed JSON body.
    async fn get_json(&self, endpoint: &str, interactive: bool) -> Result<Value, GraphError>;

    /// Authenticated GET returning the raw body bytes.
    async fn get_bytes(&self, endpoint: &str, interactive: bool) -> Result<Vec<u8>, GraphError>;

    /// Authenticated POST with a JSON body. Returns `Value::Null` for
    /// responses without a body (204).
    async fn post_json(
        &self,
        endpoint: &str,
        body: Value,
        interactive: bool,
    ) -> Result<Value, GraphError>;
}

/// Graph API failure, classified by HTTP status.
///
/// Only [`GraphError::NotFound`] and [`GraphError::AccessDenied`] are
/// cascade-safe; every other variant is fatal to a resolution attempt.
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("not found ({status}): {endpoint}")]
    NotFound {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("access denied ({status}): {endpoint}")]
    AccessDenied {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("interactive sign-in required")]
    AuthRequired,

    #[error("auth failure: {0}")]
    Auth(String),

    #[error("graph request failed ({status}) at {endpoint}: {body}")]
    Api {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("network error: {0}")]
    Network(String),

    #[error("parse error: {0}")]
    Parse(String),
}
