//! CORS handling.
//!
//! Two flavours live here. The checkout route uses the `actix-cors` middleware
//! with an explicit origin allow-list. The relay route cannot: it must answer
//! every preflight with 204 and reflect whichever origin asked, since access is
//! decided by the shared secret rather than by origin. [`RelayCors`] writes those
//! headers by hand on every response, errors included.

use actix_cors::Cors;
use actix_web::http::header;
use actix_web::{HttpRequest, HttpResponse, HttpResponseBuilder};
use flowrelay::{RELAY_ALLOW_HEADERS, RELAY_ALLOW_METHODS};

use crate::error::GatewayError;

/// Build the allow-list CORS middleware used on the checkout route.
///
/// `*` in the list admits any origin.
pub fn build_cors(allowed_origins: &[String]) -> Cors {
    let allowed = allowed_origins.to_vec();
    Cors::default()
        .allowed_origin_fn(move |origin, _req_head| {
            let origin_str = origin.to_str().unwrap_or("");
            allowed.iter().any(|a| a == "*" || a == origin_str)
        })
        .allowed_methods(vec!["POST", "OPTIONS"])
        .allowed_headers(vec![header::ACCEPT, header::CONTENT_TYPE])
        .max_age(3600)
}

/// Per-request CORS headers for the relay route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayCors {
    allow_origin: String,
}

impl RelayCors {
    pub fn for_origin(origin: Option<&str>) -> Self {
        let allow_origin = origin
            .filter(|o| !o.is_empty())
            .unwrap_or("*")
            .to_string();
        Self { allow_origin }
    }

    pub fn from_request(req: &HttpRequest) -> Self {
        Self::for_origin(
            req.headers()
                .get(header::ORIGIN)
                .and_then(|v| v.to_str().ok()),
        )
    }

    pub fn allow_origin(&self) -> &str {
        &self.allow_origin
    }

    pub fn apply(&self, builder: &mut HttpResponseBuilder) {
        builder
            .insert_header((
                header::ACCESS_CONTROL_ALLOW_ORIGIN,
                self.allow_origin.as_str(),
            ))
            .insert_header((header::ACCESS_CONTROL_ALLOW_METHODS, RELAY_ALLOW_METHODS))
            .insert_header((header::ACCESS_CONTROL_ALLOW_HEADERS, RELAY_ALLOW_HEADERS))
            .insert_header((header::CACHE_CONTROL, "no-store"));
        if self.allow_origin != "*" {
            builder.insert_header((header::VARY, "Origin"));
        }
    }

    /// Bodiless 204 answer to a preflight.
    pub fn preflight(&self) -> HttpResponse {
        let mut builder = HttpResponse::NoContent();
        self.apply(&mut builder);
        builder.finish()
    }

    /// JSON `{ "error": ... }` response with CORS headers attached.
    pub fn error_response(&self, err: &GatewayError) -> HttpResponse {
        let mut builder = err.response_builder();
        self.apply(&mut builder);
        err.log();
        builder.json(err.body())
    }
}
