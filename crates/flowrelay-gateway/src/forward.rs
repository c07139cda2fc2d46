//! Building and sending the forwarded call.
//!
//! Pure pieces ([`Envelope`], [`resolve_path`], [`target_url`],
//! [`ReplyBody`]) are separated from the one async function that touches the
//! network, [`forward`].

use std::error::Error as _;
use std::time::{Duration, Instant};

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde_json::{Map, Value};

use crate::error::GatewayError;
use crate::metrics::UPSTREAM_LATENCY;

/// Destination path and forward body taken from an inbound relay body.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    /// Non-empty string `path` field, if the body had one
    pub path: Option<String>,
    pub body: Value,
}

impl Envelope {
    pub fn parse(raw: &[u8]) -> Result<Self, GatewayError> {
        let incoming: Value = serde_json::from_slice(raw).map_err(|_| GatewayError::InvalidBody)?;
        Ok(Self::from_value(incoming))
    }

    /// Split a parsed body into path and forward body.
    ///
    /// Objects and arrays forward their non-null `payload` member, or
    /// themselves when there is none. The `path` field is left in place in
    /// that fallback. Scalars and `null` forward an empty object.
    pub fn from_value(incoming: Value) -> Self {
        let path = incoming
            .get("path")
            .and_then(Value::as_str)
            .filter(|p| !p.is_empty())
            .map(str::to_string);

        let body = match incoming {
            Value::Object(_) | Value::Array(_) => {
                let payload = incoming.get("payload").filter(|p| !p.is_null()).cloned();
                payload.unwrap_or(incoming)
            }
            _ => Value::Object(Map::new()),
        };

        Self { path, body }
    }
}

/// Pick the body's path, else the configured default.
pub fn resolve_path<'a>(
    explicit: Option<&'a str>,
    default: Option<&'a str>,
) -> Result<&'a str, GatewayError> {
    explicit
        .filter(|p| !p.is_empty())
        .or(default.filter(|p| !p.is_empty()))
        .ok_or(GatewayError::MissingPath)
}

/// Reject paths that would escape the prefix or smuggle control characters.
///
/// Checks the percent-decoded form; the caller keeps using the original.
pub fn sanitize_path(path: &str) -> Result<(), GatewayError> {
    let decoded = urlencoding::decode(path)
        .map_err(|_| GatewayError::InvalidPath("invalid URL encoding"))?;

    // URL parsing treats a backslash as a separator for http(s)
    if decoded.split(['/', '\\']).any(|segment| segment == "..") {
        return Err(GatewayError::InvalidPath("path traversal not allowed"));
    }

    if decoded.contains(['\r', '\n', '\0']) {
        return Err(GatewayError::InvalidPath("control characters not allowed"));
    }

    Ok(())
}

/// `<base>/<prefix>/<path>`, dropping one trailing slash from base and prefix
/// and one leading slash from the path.
pub fn target_url(base: &str, prefix: &str, path: &str) -> String {
    let base = base.strip_suffix('/').unwrap_or(base);
    let prefix = prefix.strip_suffix('/').unwrap_or(prefix);
    let path = path.strip_prefix('/').unwrap_or(path);
    format!("{base}/{prefix}/{path}")
}

/// Upstream body, kept as JSON when it parses as a JSON document.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyBody {
    Json(Value),
    Text(String),
}

impl ReplyBody {
    pub fn from_text(text: String) -> Self {
        match serde_json::from_str::<Value>(&text) {
            // A bare JSON string is returned as the text it came in as
            Ok(Value::String(_)) | Err(_) => ReplyBody::Text(text),
            Ok(value) => ReplyBody::Json(value),
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            ReplyBody::Json(value) => value.to_string().into_bytes(),
            ReplyBody::Text(text) => text.into_bytes(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamReply {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: ReplyBody,
}

/// POST `body` as JSON to `target_url`.
///
/// Sending and reading the full response race `timeout`; when the timer wins
/// the in-flight future is dropped, which aborts the connection.
pub async fn forward(
    client: &reqwest::Client,
    target_url: &str,
    body: &Value,
    auth_header: Option<&str>,
    timeout: Duration,
) -> Result<UpstreamReply, GatewayError> {
    let mut request = client
        .post(target_url)
        .header(CONTENT_TYPE, "application/json")
        .body(body.to_string());

    if let Some(auth) = auth_header {
        request = request.header(AUTHORIZATION, auth);
    }

    let started = Instant::now();
    let outcome = tokio::time::timeout(timeout, send_and_read(request)).await;
    UPSTREAM_LATENCY.observe(started.elapsed().as_secs_f64());

    match outcome {
        Ok(result) => result,
        Err(_elapsed) => Err(GatewayError::UpstreamTimeout),
    }
}

async fn send_and_read(request: reqwest::RequestBuilder) -> Result<UpstreamReply, GatewayError> {
    let response = request.send().await.map_err(transport_error)?;

    let status = response.status().as_u16();
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    // Replies of any size pass through; the deadline bounds slow ones
    let body = response.bytes().await.map_err(transport_error)?;
    let text = String::from_utf8_lossy(&body).into_owned();

    Ok(UpstreamReply {
        status,
        content_type,
        body: ReplyBody::from_text(text),
    })
}

/// Message for a failed call, with its cause chain and without the target URL.
fn transport_error(e: reqwest::Error) -> GatewayError {
    if e.is_timeout() {
        return GatewayError::UpstreamTimeout;
    }

    let e = e.without_url();
    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    GatewayError::UpstreamError(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_with_path_and_payload() {
        let env = Envelope::from_value(json!({ "path": "a/b", "payload": { "x": 1 } }));
        assert_eq!(env.path.as_deref(), Some("a/b"));
        assert_eq!(env.body, json!({ "x": 1 }));
    }

    #[test]
    fn test_envelope_whole_body_fallback_keeps_path() {
        let env = Envelope::from_value(json!({ "path": "a", "email": "a@b.co" }));
        assert_eq!(env.path.as_deref(), Some("a"));
        assert_eq!(env.body, json!({ "path": "a", "email": "a@b.co" }));

        let env = Envelope::from_value(json!({ "x": 1 }));
        assert_eq!(env.path, None);
        assert_eq!(env.body, json!({ "x": 1 }));
    }

    #[test]
    fn test_envelope_null_payload_falls_back() {
        let env = Envelope::from_value(json!({ "payload": null, "y": 2 }));
        assert_eq!(env.body, json!({ "payload": null, "y": 2 }));
    }

    #[test]
    fn test_envelope_scalars_forward_empty_object() {
        for value in [json!(null), json!(42), json!("text"), json!(true)] {
            let env = Envelope::from_value(value);
            assert_eq!(env.path, None);
            assert_eq!(env.body, json!({}));
        }
    }

    #[test]
    fn test_envelope_array_forwarded_whole() {
        let env = Envelope::from_value(json!([1, 2, 3]));
        assert_eq!(env.body, json!([1, 2, 3]));
    }

    #[test]
    fn test_envelope_non_string_path_ignored() {
        let env = Envelope::from_value(json!({ "path": 7, "payload": {} }));
        assert_eq!(env.path, None);
    }

    #[test]
    fn test_parse_rejects_non_json() {
        assert!(matches!(
            Envelope::parse(b"not json"),
            Err(GatewayError::InvalidBody)
        ));
        assert!(matches!(Envelope::parse(b""), Err(GatewayError::InvalidBody)));
    }

    #[test]
    fn test_resolve_path_prefers_explicit() {
        assert_eq!(resolve_path(Some("a"), Some("d")).unwrap(), "a");
        assert_eq!(resolve_path(None, Some("d")).unwrap(), "d");
        assert_eq!(resolve_path(Some(""), Some("d")).unwrap(), "d");
        assert!(matches!(
            resolve_path(None, Some("")),
            Err(GatewayError::MissingPath)
        ));
        assert!(matches!(resolve_path(None, None), Err(GatewayError::MissingPath)));
    }

    #[test]
    fn test_target_url_joins_segments() {
        assert_eq!(
            target_url("https://flows.example.com/", "webhook", "/a/b"),
            "https://flows.example.com/webhook/a/b"
        );
        assert_eq!(
            target_url("https://flows.example.com", "webhook-test/", "signup"),
            "https://flows.example.com/webhook-test/signup"
        );
    }

    #[test]
    fn test_target_url_strips_only_one_slash() {
        assert_eq!(
            target_url("https://h//", "p", "//x"),
            "https://h//p//x"
        );
    }

    #[test]
    fn test_sanitize_path() {
        assert!(sanitize_path("signup/new").is_ok());
        assert!(sanitize_path("a/b..c").is_ok());
        assert!(matches!(
            sanitize_path("../rest/workflows"),
            Err(GatewayError::InvalidPath(_))
        ));
        assert!(matches!(
            sanitize_path("a/%2e%2e/b"),
            Err(GatewayError::InvalidPath(_))
        ));
        assert!(matches!(
            sanitize_path("a\\..\\b"),
            Err(GatewayError::InvalidPath(_))
        ));
        assert!(matches!(
            sanitize_path("a%0d%0aHost: evil"),
            Err(GatewayError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_reply_body_detection() {
        assert_eq!(
            ReplyBody::from_text(r#"{ "ok" : true }"#.to_string()),
            ReplyBody::Json(json!({ "ok": true }))
        );
        assert_eq!(
            ReplyBody::from_text("Workflow was started".to_string()),
            ReplyBody::Text("Workflow was started".to_string())
        );
        assert_eq!(
            ReplyBody::from_text(r#""quoted""#.to_string()),
            ReplyBody::Text(r#""quoted""#.to_string())
        );
        assert_eq!(ReplyBody::from_text(String::new()), ReplyBody::Text(String::new()));
    }

    #[test]
    fn test_json_reply_is_compacted_in_order() {
        let body = ReplyBody::from_text("{ \"b\": 1,\n  \"a\": [1, 2] }".to_string());
        assert_eq!(body.into_bytes(), br#"{"b":1,"a":[1,2]}"#.to_vec());
    }
}
