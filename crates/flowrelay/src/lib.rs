//! Shared primitives for the flowrelay gateway.
//!
//! The gateway forwards browser-originated events (signups, form posts) to a
//! workflow-automation webhook. This crate holds the pieces that both sides of
//! that exchange agree on:
//!
//! - [`constants`]: header names, default prefix and timeouts
//! - [`security`]: constant-time shared-secret comparison
//! - [`signature`]: verification of signed payment-provider webhooks
//! - [`client`]: [`RelayClient`], a typed caller for the gateway
//!
//! # Quick example (client)
//!
//! ```no_run
//! use flowrelay::RelayClient;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let client = RelayClient::new("https://example.com/api/relay", "shared-secret");
//! let reply = client
//!     .send(Some("signup/new"), &serde_json::json!({ "email": "a@b.co" }))
//!     .await
//!     .unwrap();
//! assert!(reply.ok);
//! # }
//! ```

pub mod client;
pub mod constants;
pub mod error;
pub mod security;
pub mod signature;

pub use client::{RelayClient, RelayReply};
pub use constants::*;
pub use error::RelayError;
