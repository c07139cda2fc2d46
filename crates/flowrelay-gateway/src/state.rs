use crate::billing::{notifier_from_config, Notifier, StripeCheckout};
use crate::config::GatewayConfig;
use std::sync::Arc;

/// Shared application state
///
/// Nothing in here is mutated after construction; concurrent requests share
/// the config and the pooled HTTP client and nothing else.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub http_client: reqwest::Client,
    pub checkout: StripeCheckout,
    pub notifier: Arc<dyn Notifier>,
}

impl AppState {
    pub fn new(config: GatewayConfig) -> Result<Self, reqwest::Error> {
        // No client-wide timeout: the relay bounds each call itself so a
        // timeout can be told apart from other transport failures.
        let http_client = reqwest::Client::builder().build()?;

        let checkout = StripeCheckout::new(http_client.clone(), &config.billing);
        let notifier = notifier_from_config(http_client.clone(), &config.billing);

        Ok(Self {
            config: Arc::new(config),
            http_client,
            checkout,
            notifier,
        })
    }

    /// Replace the welcome notifier.
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }
}
