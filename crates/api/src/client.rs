//! Authenticated JSON client.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use fly8_core::session::SessionStore;
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde_json::Value;

use crate::error::ApiError;

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Callback fired after a 401 has cleared the session.
pub type UnauthenticatedHook = Arc<dyn Fn() + Send + Sync>;

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: Arc<dyn SessionStore>,
    unauthenticated_hooks: RwLock<Vec<UnauthenticatedHook>>,
}

impl ApiClient {
    /// Create a client for `base_url` (e.g. `http://localhost:4000`).
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        session: Arc<dyn SessionStore>,
    ) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(http, base_url, session))
    }

    /// Reuse an existing [`reqwest::Client`].
    pub fn with_client(
        http: reqwest::Client,
        base_url: impl Into<String>,
        session: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session,
            unauthenticated_hooks: RwLock::new(Vec::new()),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &Arc<dyn SessionStore> {
        &self.session
    }

    /// Register a callback fired whenever the backend answers 401.
    pub fn on_unauthenticated<F>(&self, hook: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.unauthenticated_hooks
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(Arc::new(hook));
    }

    // ---- request helpers used by the endpoint modules ----

    pub(crate) async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Value, ApiError> {
        self.execute(Method::GET, path, query, None::<&()>).await
    }

    pub(crate) async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Value, ApiError> {
        self.execute(Method::POST, path, &[], Some(body)).await
    }

    pub(crate) async fn put<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: Option<&B>,
    ) -> Result<Value, ApiError> {
        self.execute(Method::PUT, path, &[], body).await
    }

    pub(crate) async fn delete(&self, path: &str) -> Result<Value, ApiError> {
        self.execute(Method::DELETE, path, &[], None::<&()>).await
    }

    async fn execute<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> Result<Value, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.http.request(method.clone(), &url);

        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(token) = self.session.token() {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                tracing::warn!(method = %method, path, "Request timed out");
                ApiError::Timeout
            } else {
                ApiError::Request(e)
            }
        })?;

        let response = self.ensure_success(response, path).await?;
        Self::parse_body(response).await
    }

    /// Map a non-2xx response to an [`ApiError`], handling 401 and 403.
    async fn ensure_success(
        &self,
        response: reqwest::Response,
        path: &str,
    ) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::UNAUTHORIZED {
            self.handle_unauthenticated(path);
            return Err(ApiError::Unauthorized);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        let message = error_message(&body);

        if status == StatusCode::FORBIDDEN {
            tracing::warn!(path, message = %message, "Access forbidden");
        }

        Err(ApiError::Api {
            status: status.as_u16(),
            message,
        })
    }

    fn handle_unauthenticated(&self, path: &str) {
        tracing::warn!(path, "Backend rejected credentials, clearing session");
        if let Err(e) = self.session.clear() {
            tracing::error!(error = %e, "Failed to clear session");
        }

        let hooks = self
            .unauthenticated_hooks
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        for hook in hooks {
            hook();
        }
    }

    async fn parse_body(response: reqwest::Response) -> Result<Value, ApiError> {
        let bytes = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                ApiError::Timeout
            } else {
                ApiError::Request(e)
            }
        })?;
        if bytes.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

/// Pull the `message` field out of an error body, falling back to the
/// raw text.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

/// Return `body[key]` when present, otherwise the whole body.
pub(crate) fn unwrap_envelope(body: Value, key: &str) -> Value {
    match body {
        Value::Object(mut map) if map.contains_key(key) => map.remove(key).unwrap_or(Value::Null),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn error_message_prefers_message_field() {
        assert_eq!(error_message(r#"{"message":"Student not found"}"#), "Student not found");
        assert_eq!(error_message("Bad Gateway"), "Bad Gateway");
        assert_eq!(error_message(r#"{"error":"x"}"#), r#"{"error":"x"}"#);
    }

    #[test]
    fn unwrap_envelope_extracts_key() {
        let body = json!({ "success": true, "stats": { "total": 4 } });
        assert_eq!(unwrap_envelope(body, "stats"), json!({ "total": 4 }));
    }

    #[test]
    fn unwrap_envelope_passes_through_bare_body() {
        let body = json!({ "total": 4 });
        assert_eq!(unwrap_envelope(body.clone(), "stats"), body);
    }
}
