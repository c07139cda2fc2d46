use std::time::Duration;

/// Header carrying the caller's shared secret.
pub const SECRET_HEADER: &str = "X-Proxy-Secret";

/// Header carrying the payment provider's webhook signature.
pub const SIGNATURE_HEADER: &str = "Stripe-Signature";

/// Path segment inserted between the base endpoint and the resolved path.
pub const DEFAULT_WEBHOOK_PREFIX: &str = "webhook";

/// Mount point of the relay route on the gateway.
pub const DEFAULT_PROXY_PATH: &str = "/api/relay";

/// Upper bound on one forwarded call, body read included.
pub const UPSTREAM_TIMEOUT: Duration = Duration::from_millis(30_000);

/// Maximum age (either direction) of a signed webhook timestamp.
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

/// Methods advertised on relay preflight responses.
pub const RELAY_ALLOW_METHODS: &str = "POST, OPTIONS";

/// Request headers advertised on relay preflight responses.
pub const RELAY_ALLOW_HEADERS: &str = "Content-Type, X-Proxy-Secret";
