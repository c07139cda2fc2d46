use actix_web::http::{header, StatusCode};
use actix_web::{HttpResponse, HttpResponseBuilder, ResponseError};

/// Every way a gateway request can fail.
///
/// The `Display` text is exactly what callers see in `{ "error": ... }`.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Method Not Allowed")]
    MethodNotAllowed,

    /// A required setting is absent; names the variable
    #[error("Server not configured: {0} missing")]
    ServerMisconfigured(&'static str),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Invalid JSON body")]
    InvalidBody,

    /// Inbound body over the relay's size limit; carries the limit in bytes
    #[error("Request body too large (max {0} bytes)")]
    PayloadTooLarge(usize),

    #[error("Missing webhook path. Include {{ \"path\": \"your/webhook\" }} or set RELAY_WEBHOOK_PATH.")]
    MissingPath,

    #[error("Invalid webhook path: {0}")]
    InvalidPath(&'static str),

    #[error("Upstream timeout")]
    UpstreamTimeout,

    #[error("{0}")]
    UpstreamError(String),

    #[error("Server not configured. Missing STRIPE_SECRET_KEY or STRIPE_PRICE_ID.")]
    CheckoutUnconfigured,

    #[error("{0}")]
    Checkout(String),

    /// Signature or event decoding failure on the billing webhook
    #[error("Webhook Error: {0}")]
    WebhookRejected(String),
}

impl GatewayError {
    /// Response builder carrying the status and the headers every error shares.
    pub fn response_builder(&self) -> HttpResponseBuilder {
        let mut builder = HttpResponse::build(self.status_code());
        builder.insert_header((header::CACHE_CONTROL, "no-store"));
        builder
    }

    /// Stable label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::MethodNotAllowed => "method_not_allowed",
            GatewayError::ServerMisconfigured(_) | GatewayError::CheckoutUnconfigured => {
                "misconfigured"
            }
            GatewayError::Unauthorized => "unauthorized",
            GatewayError::InvalidBody => "invalid_body",
            GatewayError::PayloadTooLarge(_) => "payload_too_large",
            GatewayError::MissingPath => "missing_path",
            GatewayError::InvalidPath(_) => "invalid_path",
            GatewayError::UpstreamTimeout => "upstream_timeout",
            GatewayError::UpstreamError(_) => "upstream_error",
            GatewayError::Checkout(_) => "checkout_error",
            GatewayError::WebhookRejected(_) => "webhook_rejected",
        }
    }

    pub fn body(&self) -> serde_json::Value {
        serde_json::json!({ "error": self.to_string() })
    }

    pub(crate) fn log(&self) {
        match self {
            GatewayError::UpstreamError(msg) => tracing::error!("Upstream error: {}", msg),
            GatewayError::UpstreamTimeout => tracing::warn!("Upstream timeout"),
            GatewayError::Checkout(msg) => tracing::error!("Checkout error: {}", msg),
            GatewayError::ServerMisconfigured(var) => {
                tracing::error!("Request refused, {} is not configured", var)
            }
            GatewayError::CheckoutUnconfigured => {
                tracing::error!("Checkout refused, payment provider is not configured")
            }
            GatewayError::WebhookRejected(msg) => {
                tracing::warn!("Webhook signature verification failed: {}", msg)
            }
            _ => {}
        }
    }
}

impl ResponseError for GatewayError {
    fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            GatewayError::Unauthorized => StatusCode::UNAUTHORIZED,
            GatewayError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            GatewayError::InvalidBody
            | GatewayError::MissingPath
            | GatewayError::InvalidPath(_)
            | GatewayError::WebhookRejected(_) => StatusCode::BAD_REQUEST,
            GatewayError::UpstreamTimeout | GatewayError::UpstreamError(_) => {
                StatusCode::BAD_GATEWAY
            }
            GatewayError::ServerMisconfigured(_)
            | GatewayError::CheckoutUnconfigured
            | GatewayError::Checkout(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        self.log();
        match self {
            // The provider's dashboard shows this body verbatim
            GatewayError::WebhookRejected(_) => self
                .response_builder()
                .content_type("text/plain; charset=utf-8")
                .body(self.to_string()),
            _ => self.response_builder().json(self.body()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(GatewayError::MethodNotAllowed.status_code(), 405);
        assert_eq!(GatewayError::ServerMisconfigured("X").status_code(), 500);
        assert_eq!(GatewayError::Unauthorized.status_code(), 401);
        assert_eq!(GatewayError::InvalidBody.status_code(), 400);
        assert_eq!(GatewayError::PayloadTooLarge(1024).status_code(), 413);
        assert_eq!(GatewayError::MissingPath.status_code(), 400);
        assert_eq!(GatewayError::UpstreamTimeout.status_code(), 502);
        assert_eq!(
            GatewayError::UpstreamError("boom".into()).status_code(),
            502
        );
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            GatewayError::ServerMisconfigured("RELAY_BASE_URL").to_string(),
            "Server not configured: RELAY_BASE_URL missing"
        );
        assert_eq!(
            GatewayError::MissingPath.to_string(),
            r#"Missing webhook path. Include { "path": "your/webhook" } or set RELAY_WEBHOOK_PATH."#
        );
        assert_eq!(GatewayError::UpstreamTimeout.body()["error"], "Upstream timeout");
    }
}
