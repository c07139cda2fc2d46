//! Payment-provider collaborators: checkout sessions, verified webhook
//! events, and the welcome notification a completed checkout triggers.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::BillingConfig;
use crate::error::GatewayError;

/// Event type that triggers a welcome notification.
pub const CHECKOUT_COMPLETED: &str = "checkout.session.completed";

const CHECKOUT_TIMEOUT: Duration = Duration::from_secs(30);
const NOTIFY_TIMEOUT: Duration = Duration::from_secs(5);

/// Optional body of `POST /api/checkout`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CheckoutRequest {
    pub customer_email: Option<String>,
    pub metadata: Option<Map<String, Value>>,
}

impl CheckoutRequest {
    /// Read each field on its own: a missing, malformed or mistyped body
    /// yields whatever fields are still usable.
    pub fn from_body(raw: &[u8]) -> Self {
        let Ok(body) = serde_json::from_slice::<Value>(raw) else {
            return Self::default();
        };
        Self {
            customer_email: body
                .get("customer_email")
                .and_then(Value::as_str)
                .map(str::to_string),
            metadata: body.get("metadata").and_then(Value::as_object).cloned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub url: Option<String>,
}

/// Creates subscription checkout sessions over the provider's HTTP API.
#[derive(Clone)]
pub struct StripeCheckout {
    http: reqwest::Client,
    api_base: String,
    secret_key: Option<String>,
    price_id: Option<String>,
}

impl StripeCheckout {
    pub fn new(http: reqwest::Client, config: &BillingConfig) -> Self {
        Self {
            http,
            api_base: config.api_base.clone(),
            secret_key: config.secret_key.clone().filter(|s| !s.is_empty()),
            price_id: config.price_id.clone().filter(|s| !s.is_empty()),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.secret_key.is_some() && self.price_id.is_some()
    }

    pub async fn create_session(
        &self,
        app_url: &str,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, GatewayError> {
        let (Some(secret_key), Some(price_id)) = (&self.secret_key, &self.price_id) else {
            return Err(GatewayError::CheckoutUnconfigured);
        };

        let url = format!(
            "{}/v1/checkout/sessions",
            self.api_base.trim_end_matches('/')
        );

        let response = self
            .http
            .post(&url)
            .bearer_auth(secret_key)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(checkout_form(price_id, app_url, request))
            .timeout(CHECKOUT_TIMEOUT)
            .send()
            .await
            .map_err(|e| GatewayError::Checkout(e.without_url().to_string()))?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| GatewayError::Checkout(format!("invalid provider response: {e}")))?;

        if !status.is_success() {
            let message = body
                .pointer("/error/message")
                .and_then(Value::as_str)
                .unwrap_or("Checkout error");
            return Err(GatewayError::Checkout(message.to_string()));
        }

        Ok(CheckoutSession {
            url: body.get("url").and_then(Value::as_str).map(str::to_string),
        })
    }
}

/// Form-encoded session parameters: one subscription line item, promotion
/// codes allowed, success/cancel redirects back to the landing page.
pub fn checkout_form(price_id: &str, app_url: &str, request: &CheckoutRequest) -> String {
    let mut form = url::form_urlencoded::Serializer::new(String::new());
    form.append_pair("mode", "subscription")
        .append_pair("line_items[0][price]", price_id)
        .append_pair("line_items[0][quantity]", "1")
        .append_pair("allow_promotion_codes", "true")
        .append_pair("success_url", &format!("{app_url}/?checkout=success"))
        .append_pair("cancel_url", &format!("{app_url}/?checkout=cancel"));

    if let Some(ref email) = request.customer_email {
        form.append_pair("customer_email", email);
    }

    if let Some(ref metadata) = request.metadata {
        for (key, value) in metadata {
            let value = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            form.append_pair(&format!("metadata[{key}]"), &value);
        }
    }

    form.finish()
}

/// A verified webhook event. Only the fields the gateway acts on are typed.
#[derive(Debug, Clone, Deserialize)]
pub struct BillingEvent {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub data: EventData,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventData {
    #[serde(default)]
    pub object: Value,
}

impl BillingEvent {
    pub fn customer_email(&self) -> Option<&str> {
        self.data
            .object
            .get("customer_details")?
            .get("email")?
            .as_str()
            .filter(|e| !e.is_empty())
    }
}

/// Receives the customer's email when a checkout completes.
///
/// Implementations must not block; anything slow belongs on a spawned task.
pub trait Notifier: Send + Sync {
    fn welcome(&self, email: &str);
}

/// Records the event in the log only.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn welcome(&self, email: &str) {
        tracing::info!(email = %email, "checkout completed, no welcome webhook configured");
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WelcomeWebhook {
    pub event: String,
    pub email: String,
    pub timestamp: i64,
}

/// Fire-and-forget POST of a [`WelcomeWebhook`] to a fixed URL.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

impl Notifier for WebhookNotifier {
    fn welcome(&self, email: &str) {
        let webhook = WelcomeWebhook {
            event: "customer.welcome".to_string(),
            email: email.to_string(),
            timestamp: chrono::Utc::now().timestamp(),
        };
        let client = self.client.clone();
        let url = self.url.clone();

        tokio::spawn(async move {
            let result = client
                .post(&url)
                .json(&webhook)
                .timeout(NOTIFY_TIMEOUT)
                .send()
                .await;
            match result {
                Ok(resp) => {
                    tracing::debug!(url = %url, status = %resp.status(), "welcome webhook delivered")
                }
                Err(e) => tracing::warn!(url = %url, error = %e, "welcome webhook delivery failed"),
            }
        });
    }
}

pub fn notifier_from_config(client: reqwest::Client, config: &BillingConfig) -> Arc<dyn Notifier> {
    match config.welcome_webhook_url {
        Some(ref url) => Arc::new(WebhookNotifier::new(client, url.clone())),
        None => Arc::new(LogNotifier),
    }
}
