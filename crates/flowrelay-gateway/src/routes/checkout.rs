use actix_web::http::{header, Method};
use actix_web::{web, HttpRequest, HttpResponse};

use crate::billing::CheckoutRequest;
use crate::cors::build_cors;
use crate::error::GatewayError;
use crate::metrics::CHECKOUT_SESSIONS_TOTAL;
use crate::routes::post_only;
use crate::state::AppState;

/// POST /api/checkout - Create a subscription checkout session
pub async fn checkout(
    req: HttpRequest,
    body: web::Bytes,
    state: web::Data<AppState>,
) -> Result<HttpResponse, GatewayError> {
    if req.method() != Method::POST {
        return Ok(post_only());
    }

    if !state.checkout.is_configured() {
        return Err(GatewayError::CheckoutUnconfigured);
    }

    let app_url = match state.config.billing.app_url {
        Some(ref url) => url.clone(),
        None => request_origin(&req),
    };

    let request = CheckoutRequest::from_body(&body);

    let session = state.checkout.create_session(&app_url, &request).await?;
    CHECKOUT_SESSIONS_TOTAL.inc();

    Ok(HttpResponse::Ok().json(session))
}

fn request_origin(req: &HttpRequest) -> String {
    let origin = req
        .headers()
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    origin.strip_suffix('/').unwrap_or(origin).to_string()
}

/// Mount the route behind the origin allow-list.
pub fn configure(allowed_origins: Vec<String>) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg| {
        cfg.service(
            web::resource("/api/checkout")
                .wrap(build_cors(&allowed_origins))
                .route(web::route().to(checkout)),
        );
    }
}
