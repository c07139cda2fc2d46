use actix_web::http::Method;
use actix_web::{web, HttpRequest, HttpResponse};
use flowrelay::signature::verify_signature;
use flowrelay::SIGNATURE_HEADER;

use crate::billing::{BillingEvent, CHECKOUT_COMPLETED};
use crate::error::GatewayError;
use crate::metrics::{BILLING_EVENTS_TOTAL, SIGNATURE_FAILURES};
use crate::routes::post_only;
use crate::state::AppState;

/// POST /api/billing/webhook - Verify a signed provider event and act on it
///
/// The raw body is taken as bytes: the signature covers the exact payload.
pub async fn billing_webhook(
    req: HttpRequest,
    body: web::Bytes,
    state: web::Data<AppState>,
) -> Result<HttpResponse, GatewayError> {
    if req.method() != Method::POST {
        return Ok(post_only());
    }

    let secret = state
        .config
        .billing
        .webhook_secret
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or(GatewayError::ServerMisconfigured("STRIPE_WEBHOOK_SECRET"))?;

    let signature = req
        .headers()
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    verify_signature(
        &body,
        signature,
        secret.as_bytes(),
        chrono::Utc::now().timestamp(),
    )
    .map_err(|e| {
        SIGNATURE_FAILURES.inc();
        GatewayError::WebhookRejected(e.to_string())
    })?;

    let event: BillingEvent = serde_json::from_slice(&body)
        .map_err(|e| GatewayError::WebhookRejected(format!("invalid event payload: {e}")))?;

    BILLING_EVENTS_TOTAL
        .with_label_values(&[event.event_type.as_str()])
        .inc();

    match event.event_type.as_str() {
        CHECKOUT_COMPLETED => match event.customer_email() {
            Some(email) => state.notifier.welcome(email),
            None => tracing::info!(
                event_id = ?event.id,
                "checkout completed without a customer email"
            ),
        },
        other => tracing::debug!(event_type = %other, "ignoring billing event"),
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({ "received": true })))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/api/billing/webhook").route(web::route().to(billing_webhook)));
}
