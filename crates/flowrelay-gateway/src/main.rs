use actix_governor::{Governor, GovernorConfigBuilder};
use actix_web::{middleware::Logger, web, App, HttpServer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use flowrelay_gateway::{config::GatewayConfig, metrics::register_metrics, routes, state::AppState};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = GatewayConfig::from_env()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
    let port = config.port;
    let allowed_origins = config.allowed_origins.clone();
    let rate_limit_rpm = config.rate_limit_rpm;
    let spa_dir = config.spa_dir.clone();

    tracing::info!("Starting flowrelay-gateway on port {}", port);
    tracing::info!(
        "Relay: {}",
        match config.relay.base_url() {
            Some(base) => format!("{}/{}/<path>", base.trim_end_matches('/'), config.relay.prefix()),
            None => "disabled (RELAY_BASE_URL missing)".to_string(),
        }
    );
    tracing::info!("Relay timeout: {:?}", config.relay.timeout);

    register_metrics().map_err(std::io::Error::other)?;

    let state = AppState::new(config).map_err(std::io::Error::other)?;
    let state_data = web::Data::new(state);

    let governor_conf = GovernorConfigBuilder::default()
        .requests_per_minute(rate_limit_rpm as u64)
        .finish()
        .ok_or_else(|| std::io::Error::other("invalid rate limiter config"))?;

    if let Some(ref dir) = spa_dir {
        tracing::info!("Serving landing page from: {}", dir);
    }

    HttpServer::new(move || {
        let mut app = App::new()
            .app_data(state_data.clone())
            .wrap(Logger::default())
            .wrap(Governor::new(&governor_conf))
            .configure(routes::health::configure)
            .configure(routes::relay::configure)
            .configure(routes::checkout::configure(allowed_origins.clone()))
            .configure(routes::billing_webhook::configure);

        // Serve the landing page last (catch-all) if configured
        if let Some(ref dir) = spa_dir {
            let index_path = format!("{}/index.html", dir);
            app = app.service(
                actix_files::Files::new("/", dir)
                    .index_file("index.html")
                    .default_handler(web::to(move || {
                        let path = index_path.clone();
                        async move { actix_files::NamedFile::open_async(path).await }
                    })),
            );
        }

        app
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
