pub mod billing_webhook;
pub mod checkout;
pub mod health;
pub mod relay;

use actix_web::http::header;
use actix_web::HttpResponse;

use crate::error::GatewayError;

/// 405 for the POST-only billing routes.
pub(crate) fn post_only() -> HttpResponse {
    let err = GatewayError::MethodNotAllowed;
    let mut builder = err.response_builder();
    builder.insert_header((header::ALLOW, "POST"));
    builder.json(err.body())
}
