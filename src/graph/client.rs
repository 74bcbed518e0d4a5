//! `reqwest`-backed Graph client.
//!
//! All requests go to the fixed v1.0 base with a bearer token from the
//! [`AccessTokenProvider`]. Failures are classified structurally from the
//! HTTP status and the Graph error body (`error.code`), never by matching
//! rendered message text.

use async_trait::async_trait;
use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, Response};
use secrecy::ExposeSecret;
use serde_json::Value;
use std::sync::Arc;

use super::auth::{AccessTokenProvider, AuthError};
use super::http_retry::{send_with_retry, RetryConfig};
use super::{GraphApi, GraphError};

/// Microsoft Graph API base URL
const GRAPH_API_BASE: &str = "https://graph.microsoft.com/v1.0";

/// Graph API client over HTTPS.
pub struct GraphClient {
    client: reqwest::Client,
    tokens: Arc<dyn AccessTokenProvider>,
    retry: RetryConfig,
}

impl GraphClient {
    pub fn new(tokens: Arc<dyn AccessTokenProvider>) -> Self {
        Self::with_retry(tokens, RetryConfig::default())
    }

    pub fn with_retry(tokens: Arc<dyn AccessTokenProvider>, retry: RetryConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            tokens,
            retry,
        }
    }

    /// Get authorization header
    async fn auth_header(&self, interactive: bool) -> Result<HeaderValue, GraphError> {
        let token = self
            .tokens
            .access_token(interactive)
            .await
            .map_err(|e| match e {
                AuthError::AuthRequired => GraphError::AuthRequired,
                AuthError::Failed(msg) => GraphError::Auth(msg),
            })?;
        HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
            .map_err(|e| GraphError::Auth(format!("invalid token: {}", e)))
    }

    async fn request(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<Value>,
        interactive: bool,
    ) -> Result<Response, GraphError> {
        let url = format!("{}{}", GRAPH_API_BASE, endpoint);
        let mut builder = self
            .client
            .request(method, &url)
            .header(AUTHORIZATION, self.auth_header(interactive).await?);
        if let Some(body) = body {
            builder = builder
                .header(CONTENT_TYPE, "application/json")
                .body(body.to_string());
        }

        let request = builder
            .build()
            .map_err(|e| GraphError::Network(e.to_string()))?;
        let response = send_with_retry(&self.client, request, &self.retry)
            .await
            .map_err(|e| GraphError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(classify_failure(endpoint, status.as_u16(), &body))
    }
}

#[async_trait]
impl GraphApi for GraphClient {
    async fn get_json(&self, endpoint: &str, interactive: bool) -> Result<Value, GraphError> {
        let response = self.request(Method::GET, endpoint, None, interactive).await?;
        response
            .json()
            .await
            .map_err(|e| GraphError::Parse(e.to_string()))
    }

    async fn get_bytes(&self, endpoint: &str, interactive: bool) -> Result<Vec<u8>, GraphError> {
        let response = self.request(Method::GET, endpoint, None, interactive).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| GraphError::Network(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    async fn post_json(
        &self,
        endpoint: &str,
        body: Value,
        interactive: bool,
    ) -> Result<Value, GraphError> {
        let response = self
            .request(Method::POST, endpoint, Some(body), interactive)
            .await?;
        // restoreVersion and friends answer 204 with no body.
        let text = response
            .text()
            .await
            .map_err(|e| GraphError::Network(e.to_string()))?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| GraphError::Parse(e.to_string()))
    }
}

/// Classify a non-success response.
///
/// 404 and a Graph `itemNotFound` body code are "not found"; 403 and an
/// `accessDenied` body code are "access denied"; everything else stays a
/// fatal API error carrying status and body for diagnostics.
fn classify_failure(endpoint: &str, status: u16, body: &str) -> GraphError {
    let code = graph_error_code(body);
    let endpoint = endpoint.to_string();
    let body = body.to_string();
    if status == 404 || code.as_deref() == Some("itemNotFound") {
        GraphError::NotFound {
            endpoint,
            status,
            body,
        }
    } else if status == 403 || code.as_deref() == Some("accessDenied") {
        GraphError::AccessDenied {
            endpoint,
            status,
            body,
        }
    } else {
        GraphError::Api {
            endpoint,
            status,
            body,
        }
    }
}

/// The `error.code` field of a Graph error body, if the body is one.
fn graph_error_code(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .get("error")?
        .get("code")?
        .as_str()
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_404_as_not_found() {
        let err = classify_failure("/me/drive/root:/x", 404, "");
        assert!(matches!(err, GraphError::NotFound { status: 404, .. }));
    }

    #[test]
    fn test_classify_item_not_found_code_regardless_of_status() {
        let body = r#"{"error":{"code":"itemNotFound","message":"The resource could not be found."}}"#;
        let err = classify_failure("/me/drive/root:/x", 400, body);
        assert!(matches!(err, GraphError::NotFound { status: 400, .. }));
    }

    #[test]
    fn test_classify_403_as_access_denied() {
        let body = r#"{"error":{"code":"accessDenied","message":"Access denied"}}"#;
        let err = classify_failure("/drives/d1/root:/x", 403, body);
        assert!(matches!(err, GraphError::AccessDenied { status: 403, .. }));
    }

    #[test]
    fn test_classify_other_statuses_as_fatal() {
        let err = classify_failure("/me/drives", 500, "oops");
        assert!(matches!(err, GraphError::Api { status: 500, .. }));

        let err = classify_failure("/me/drives", 401, "");
        assert!(matches!(err, GraphError::Api { status: 401, .. }));
    }

    #[test]
    fn test_graph_error_code_parsing() {
        assert_eq!(
            graph_error_code(r#"{"error":{"code":"itemNotFound"}}"#).as_deref(),
            Some("itemNotFound")
        );
        assert_eq!(graph_error_code("not json"), None);
        assert_eq!(graph_error_code(r#"{"error":"flat"}"#), None);
    }
}
