use serde::Serialize;
use serde_json::Value;

use crate::{RelayError, SECRET_HEADER};

/// Typed caller for a flowrelay gateway.
///
/// Wraps `reqwest::Client`. Every call posts a `{ "path", "payload" }`
/// envelope with the shared secret attached; the reply body is decoded as JSON
/// when possible and kept as text otherwise.
pub struct RelayClient {
    http: reqwest::Client,
    proxy_url: String,
    secret: String,
}

/// Outcome of one relayed call. Non-2xx statuses are not errors.
#[derive(Debug, Clone, PartialEq)]
pub struct RelayReply {
    pub ok: bool,
    pub status: u16,
    /// Parsed JSON, or the raw body as a JSON string.
    pub data: Value,
}

#[derive(Serialize)]
struct Envelope<'a, T: Serialize> {
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<&'a str>,
    payload: &'a T,
}

impl RelayClient {
    pub fn new(proxy_url: impl Into<String>, secret: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), proxy_url, secret)
    }

    pub fn with_client(
        http: reqwest::Client,
        proxy_url: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        Self {
            http,
            proxy_url: proxy_url.into(),
            secret: secret.into(),
        }
    }

    /// Relay `payload` to `path` (or the gateway's default path when `None`).
    pub async fn send<T: Serialize>(
        &self,
        path: Option<&str>,
        payload: &T,
    ) -> Result<RelayReply, RelayError> {
        if self.secret.is_empty() {
            return Err(RelayError::Config("missing relay proxy secret".to_string()));
        }

        let body = serde_json::to_vec(&Envelope { path, payload })?;

        let resp = self
            .http
            .post(&self.proxy_url)
            .header("Content-Type", "application/json")
            .header(SECRET_HEADER, &self.secret)
            .body(body)
            .send()
            .await
            .map_err(|e| RelayError::Http(format!("request failed: {e}")))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| RelayError::Http(format!("failed to read response: {e}")))?;

        let data = serde_json::from_str(&text).unwrap_or(Value::String(text));
        tracing::debug!(status = %status, "relay call completed");

        Ok(RelayReply {
            ok: status.is_success(),
            status: status.as_u16(),
            data,
        })
    }
}
