use std::env;
use std::time::Duration;

use flowrelay::{DEFAULT_WEBHOOK_PREFIX, UPSTREAM_TIMEOUT};
use url::Url;

const DEFAULT_PORT: u16 = 4080;
const DEFAULT_RATE_LIMIT_RPM: u32 = 120;
const DEFAULT_STRIPE_API_BASE: &str = "https://api.stripe.com";

/// Settings for the `/api/relay` forwarding route.
///
/// Required values are `Option`s on purpose: a missing secret or base URL is
/// reported per request as a 500, the service still starts.
#[derive(Clone)]
pub struct RelayConfig {
    /// Shared secret callers must present in `X-Proxy-Secret`
    pub secret: Option<String>,
    /// Root of every forward target, e.g. `https://automation.example.com`
    pub base_url: Option<String>,
    /// Path used when the request body carries none
    pub default_path: Option<String>,
    /// Segment between base and path
    pub prefix: String,
    /// Static `Authorization` value attached to forwarded calls
    pub auth_header: Option<String>,
    /// Bound on one forwarded call, body read included
    pub timeout: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            secret: None,
            base_url: None,
            default_path: None,
            prefix: DEFAULT_WEBHOOK_PREFIX.to_string(),
            auth_header: None,
            timeout: UPSTREAM_TIMEOUT,
        }
    }
}

impl std::fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayConfig")
            .field("secret", &self.secret.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .field("default_path", &self.default_path)
            .field("prefix", &self.prefix)
            .field("auth_header", &self.auth_header.as_ref().map(|_| "[REDACTED]"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl RelayConfig {
    pub fn secret(&self) -> Option<&str> {
        non_empty(self.secret.as_deref())
    }

    pub fn base_url(&self) -> Option<&str> {
        non_empty(self.base_url.as_deref())
    }

    pub fn default_path(&self) -> Option<&str> {
        non_empty(self.default_path.as_deref())
    }

    pub fn auth_header(&self) -> Option<&str> {
        non_empty(self.auth_header.as_deref())
    }

    /// Prefix with an empty value falling back to the default.
    pub fn prefix(&self) -> &str {
        non_empty(Some(self.prefix.as_str())).unwrap_or(DEFAULT_WEBHOOK_PREFIX)
    }

    pub fn is_configured(&self) -> bool {
        self.secret().is_some() && self.base_url().is_some()
    }
}

/// Settings for checkout and the billing webhook.
#[derive(Clone)]
pub struct BillingConfig {
    pub secret_key: Option<String>,
    pub price_id: Option<String>,
    pub webhook_secret: Option<String>,
    /// Redirect root; the request `Origin` is used when unset
    pub app_url: Option<String>,
    pub api_base: String,
    /// Where welcome notifications are posted (None = log only)
    pub welcome_webhook_url: Option<String>,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            secret_key: None,
            price_id: None,
            webhook_secret: None,
            app_url: None,
            api_base: DEFAULT_STRIPE_API_BASE.to_string(),
            welcome_webhook_url: None,
        }
    }
}

impl std::fmt::Debug for BillingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BillingConfig")
            .field("secret_key", &self.secret_key.as_ref().map(|_| "[REDACTED]"))
            .field("price_id", &self.price_id)
            .field(
                "webhook_secret",
                &self.webhook_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("app_url", &self.app_url)
            .field("api_base", &self.api_base)
            .field("welcome_webhook_url", &self.welcome_webhook_url)
            .finish()
    }
}

#[derive(Clone)]
pub struct GatewayConfig {
    /// Server port
    pub port: u16,
    /// CORS allowed origins for the checkout route
    pub allowed_origins: Vec<String>,
    /// Rate limit requests per minute
    pub rate_limit_rpm: u32,
    /// Directory to serve the landing page from (None = don't serve it)
    pub spa_dir: Option<String>,
    /// Bearer token required for /metrics endpoint (None = public)
    pub metrics_token: Option<String>,
    pub relay: RelayConfig,
    pub billing: BillingConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            allowed_origins: default_origins(),
            rate_limit_rpm: DEFAULT_RATE_LIMIT_RPM,
            spa_dir: None,
            metrics_token: None,
            relay: RelayConfig::default(),
            billing: BillingConfig::default(),
        }
    }
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("port", &self.port)
            .field("allowed_origins", &self.allowed_origins)
            .field("rate_limit_rpm", &self.rate_limit_rpm)
            .field("spa_dir", &self.spa_dir)
            .field(
                "metrics_token",
                &self.metrics_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("relay", &self.relay)
            .field("billing", &self.billing)
            .finish()
    }
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|name| env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    pub fn from_vars<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let opt = |name: &str| var(name).filter(|s| !s.is_empty());

        let port = opt("PORT")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let allowed_origins: Vec<String> = opt("ALLOWED_ORIGINS")
            .map(|s| {
                s.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_else(default_origins);

        let rate_limit_rpm = opt("RATE_LIMIT_RPM")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_RATE_LIMIT_RPM);

        let relay = RelayConfig {
            secret: opt("RELAY_PROXY_SECRET"),
            base_url: opt("RELAY_BASE_URL"),
            default_path: opt("RELAY_WEBHOOK_PATH"),
            prefix: opt("RELAY_WEBHOOK_PREFIX")
                .unwrap_or_else(|| DEFAULT_WEBHOOK_PREFIX.to_string()),
            auth_header: opt("RELAY_AUTH_HEADER"),
            timeout: opt("RELAY_TIMEOUT_MS")
                .and_then(|s| s.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(UPSTREAM_TIMEOUT),
        };

        if let Some(ref base) = relay.base_url {
            validate_url(base)?;
        }

        let billing = BillingConfig {
            secret_key: opt("STRIPE_SECRET_KEY"),
            price_id: opt("STRIPE_PRICE_ID"),
            webhook_secret: opt("STRIPE_WEBHOOK_SECRET"),
            app_url: opt("APP_URL"),
            api_base: opt("STRIPE_API_BASE")
                .unwrap_or_else(|| DEFAULT_STRIPE_API_BASE.to_string()),
            welcome_webhook_url: opt("WELCOME_WEBHOOK_URL"),
        };

        validate_url(&billing.api_base)?;
        if let Some(ref url) = billing.welcome_webhook_url {
            validate_url(url)?;
        }

        if relay.secret.is_none() {
            tracing::warn!("RELAY_PROXY_SECRET not set, /api/relay will answer 500");
        }
        if relay.base_url.is_none() {
            tracing::warn!("RELAY_BASE_URL not set, /api/relay will answer 500");
        }
        if billing.webhook_secret.is_none() {
            tracing::warn!("STRIPE_WEBHOOK_SECRET not set, billing webhooks will be refused");
        }

        let metrics_token = opt("METRICS_TOKEN");
        if metrics_token.is_none() {
            tracing::warn!("METRICS_TOKEN not set, /metrics endpoint is publicly accessible");
        }

        Ok(Self {
            port,
            allowed_origins,
            rate_limit_rpm,
            spa_dir: opt("SPA_DIR"),
            metrics_token,
            relay,
            billing,
        })
    }
}

fn default_origins() -> Vec<String> {
    vec![
        "http://localhost:5173".to_string(),
        "http://localhost:3000".to_string(),
    ]
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.is_empty())
}

fn validate_url(url: &str) -> Result<(), ConfigError> {
    Url::parse(url)
        .map(|_| ())
        .map_err(|_| ConfigError::InvalidUrl(url.to_string()))
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<GatewayConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        GatewayConfig::from_vars(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults_when_nothing_set() {
        let config = load(&[]).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.rate_limit_rpm, DEFAULT_RATE_LIMIT_RPM);
        assert_eq!(config.relay.prefix(), "webhook");
        assert_eq!(config.relay.timeout, Duration::from_millis(30_000));
        assert!(!config.relay.is_configured());
        assert_eq!(config.billing.api_base, "https://api.stripe.com");
    }

    #[test]
    fn test_relay_settings_are_read() {
        let config = load(&[
            ("RELAY_PROXY_SECRET", "s3cret"),
            ("RELAY_BASE_URL", "https://flows.example.com/"),
            ("RELAY_WEBHOOK_PATH", "signup"),
            ("RELAY_WEBHOOK_PREFIX", "webhook-test"),
            ("RELAY_AUTH_HEADER", "Bearer abc"),
            ("RELAY_TIMEOUT_MS", "1500"),
        ])
        .unwrap();

        assert!(config.relay.is_configured());
        assert_eq!(config.relay.secret(), Some("s3cret"));
        assert_eq!(config.relay.default_path(), Some("signup"));
        assert_eq!(config.relay.prefix(), "webhook-test");
        assert_eq!(config.relay.auth_header(), Some("Bearer abc"));
        assert_eq!(config.relay.timeout, Duration::from_millis(1500));
    }

    #[test]
    fn test_empty_values_count_as_unset() {
        let config = load(&[
            ("RELAY_PROXY_SECRET", ""),
            ("RELAY_WEBHOOK_PREFIX", ""),
        ])
        .unwrap();
        assert_eq!(config.relay.secret(), None);
        assert_eq!(config.relay.prefix(), "webhook");
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let err = load(&[("RELAY_BASE_URL", "not a url")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUrl(_)));
    }

    #[test]
    fn test_allowed_origins_are_split_and_trimmed() {
        let config = load(&[("ALLOWED_ORIGINS", "https://a.example, https://b.example,")]).unwrap();
        assert_eq!(
            config.allowed_origins,
            vec!["https://a.example", "https://b.example"]
        );
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = load(&[
            ("RELAY_PROXY_SECRET", "s3cret"),
            ("STRIPE_SECRET_KEY", "sk_live_xyz"),
        ])
        .unwrap();
        let printed = format!("{config:?}");
        assert!(!printed.contains("s3cret"));
        assert!(!printed.contains("sk_live_xyz"));
        assert!(printed.contains("[REDACTED]"));
    }
}
