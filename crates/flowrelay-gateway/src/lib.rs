pub mod billing;
pub mod config;
pub mod cors;
pub mod error;
pub mod forward;
pub mod metrics;
pub mod routes;
pub mod state;

pub use config::{BillingConfig, GatewayConfig, RelayConfig};
pub use error::GatewayError;
pub use state::AppState;
