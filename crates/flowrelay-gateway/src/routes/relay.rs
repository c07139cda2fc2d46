use actix_web::http::{header, Method, StatusCode};
use actix_web::{web, HttpRequest, HttpResponse};
use flowrelay::security::secret_matches;
use flowrelay::{DEFAULT_PROXY_PATH, SECRET_HEADER};
use futures::StreamExt;

use crate::cors::RelayCors;
use crate::error::GatewayError;
use crate::forward::{forward, resolve_path, sanitize_path, target_url, Envelope, UpstreamReply};
use crate::metrics::{status_class, RELAY_REQUESTS_TOTAL, UPSTREAM_STATUS_TOTAL};
use crate::state::AppState;

/// Largest inbound relay body accepted (1 MB).
const MAX_REQUEST_BODY_SIZE: usize = 1024 * 1024;

/// ANY /api/relay - Authenticate, resolve the path and forward upstream
pub async fn relay(
    req: HttpRequest,
    payload: web::Payload,
    state: web::Data<AppState>,
) -> HttpResponse {
    let cors = RelayCors::from_request(&req);

    if req.method() == Method::OPTIONS {
        RELAY_REQUESTS_TOTAL.with_label_values(&["preflight"]).inc();
        return cors.preflight();
    }

    match handle_relay(&req, payload, &state).await {
        Ok(reply) => {
            RELAY_REQUESTS_TOTAL.with_label_values(&["forwarded"]).inc();
            UPSTREAM_STATUS_TOTAL
                .with_label_values(&[status_class(reply.status)])
                .inc();
            passthrough(reply, &cors)
        }
        Err(e) => {
            RELAY_REQUESTS_TOTAL.with_label_values(&[e.kind()]).inc();
            cors.error_response(&e)
        }
    }
}

/// Everything after the preflight check. The secret is checked before the
/// body is even read.
async fn handle_relay(
    req: &HttpRequest,
    payload: web::Payload,
    state: &AppState,
) -> Result<UpstreamReply, GatewayError> {
    if req.method() != Method::POST {
        return Err(GatewayError::MethodNotAllowed);
    }

    let relay = &state.config.relay;

    let expected = relay
        .secret()
        .ok_or(GatewayError::ServerMisconfigured("RELAY_PROXY_SECRET"))?;
    let supplied = req
        .headers()
        .get(SECRET_HEADER)
        .and_then(|v| v.to_str().ok());
    if !secret_matches(expected, supplied) {
        tracing::warn!(
            header_present = supplied.is_some(),
            "relay request rejected, shared secret mismatch"
        );
        return Err(GatewayError::Unauthorized);
    }

    let base_url = relay
        .base_url()
        .ok_or(GatewayError::ServerMisconfigured("RELAY_BASE_URL"))?;

    let body = read_body(payload).await?;
    let envelope = Envelope::parse(&body)?;

    let path = resolve_path(envelope.path.as_deref(), relay.default_path())?;
    sanitize_path(path)?;

    let url = target_url(base_url, relay.prefix(), path);
    tracing::debug!(path = %path, "forwarding relay request");

    forward(
        &state.http_client,
        &url,
        &envelope.body,
        relay.auth_header(),
        relay.timeout,
    )
    .await
}

async fn read_body(mut payload: web::Payload) -> Result<web::BytesMut, GatewayError> {
    let mut body = web::BytesMut::new();
    while let Some(chunk) = payload.next().await {
        let chunk = chunk.map_err(|e| {
            tracing::debug!(error = %e, "failed to read relay request body");
            GatewayError::InvalidBody
        })?;
        if body.len() + chunk.len() > MAX_REQUEST_BODY_SIZE {
            return Err(GatewayError::PayloadTooLarge(MAX_REQUEST_BODY_SIZE));
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

/// Relay the upstream status and body, with our own CORS headers.
fn passthrough(reply: UpstreamReply, cors: &RelayCors) -> HttpResponse {
    let mut builder =
        HttpResponse::build(StatusCode::from_u16(reply.status).unwrap_or(StatusCode::BAD_GATEWAY));
    builder.insert_header((
        header::CONTENT_TYPE,
        reply
            .content_type
            .as_deref()
            .unwrap_or("application/json"),
    ));
    cors.apply(&mut builder);
    builder.body(reply.body.into_bytes())
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource(DEFAULT_PROXY_PATH).route(web::route().to(relay)));
}
