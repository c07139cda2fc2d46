use std::sync::Once;

use actix_web::{test, web, App};
use serde_json::Value;

use flowrelay_gateway::{metrics, routes, AppState, GatewayConfig, RelayConfig};

static METRICS: Once = Once::new();

fn init_metrics() {
    METRICS.call_once(|| metrics::register_metrics().unwrap());
}

#[actix_rt::test]
async fn test_health_reports_unconfigured_features() {
    let state = web::Data::new(AppState::new(GatewayConfig::default()).unwrap());
    let app = test::init_service(App::new().app_data(state).configure(routes::health::configure)).await;

    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "flowrelay-gateway");
    assert_eq!(body["relay_configured"], false);
    assert_eq!(body["checkout_configured"], false);
    assert_eq!(body["billing_webhook_configured"], false);
}

#[actix_rt::test]
async fn test_health_reports_configured_relay() {
    let config = GatewayConfig {
        relay: RelayConfig {
            secret: Some("s3cret".to_string()),
            base_url: Some("https://flows.example".to_string()),
            ..Default::default()
        },
        ..Default::default()
    };
    let state = web::Data::new(AppState::new(config).unwrap());
    let app = test::init_service(App::new().app_data(state).configure(routes::health::configure)).await;

    let req = test::TestRequest::get().uri("/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["relay_configured"], true);
}

#[actix_rt::test]
async fn test_metrics_require_token_when_configured() {
    init_metrics();
    let config = GatewayConfig {
        metrics_token: Some("scrape-token".to_string()),
        ..Default::default()
    };
    let state = web::Data::new(AppState::new(config).unwrap());
    let app = test::init_service(App::new().app_data(state).configure(routes::health::configure)).await;

    let req = test::TestRequest::get().uri("/metrics").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);

    let req = test::TestRequest::get()
        .uri("/metrics")
        .insert_header(("Authorization", "Bearer wrong-token"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);

    let req = test::TestRequest::get()
        .uri("/metrics")
        .insert_header(("Authorization", "Bearer scrape-token"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body = test::read_body(resp).await;
    let text = std::str::from_utf8(&body).unwrap();
    assert!(text.contains("checkout_sessions_total"));
}

#[actix_rt::test]
async fn test_metrics_open_without_token() {
    init_metrics();
    let state = web::Data::new(AppState::new(GatewayConfig::default()).unwrap());
    let app = test::init_service(App::new().app_data(state).configure(routes::health::configure)).await;

    let req = test::TestRequest::get().uri("/metrics").to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 200);
}
