use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry};
use std::sync::LazyLock;

pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// Relay outcomes: "forwarded", "preflight", or the error kind
pub static RELAY_REQUESTS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new("relay_requests_total", "Relay requests by outcome"),
        &["outcome"],
    )
    .expect("valid metric definition")
});

pub static UPSTREAM_STATUS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "relay_upstream_responses_total",
            "Upstream responses by status class",
        ),
        &["class"],
    )
    .expect("valid metric definition")
});

pub static UPSTREAM_LATENCY: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        HistogramOpts::new("relay_upstream_latency_seconds", "Forwarded call latency")
            .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
    )
    .expect("valid metric definition")
});

pub static CHECKOUT_SESSIONS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "checkout_sessions_total",
        "Checkout sessions created successfully",
    )
    .expect("valid metric definition")
});

pub static BILLING_EVENTS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new("billing_events_total", "Verified billing webhook events"),
        &["type"],
    )
    .expect("valid metric definition")
});

pub static SIGNATURE_FAILURES: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "billing_signature_failures_total",
        "Billing webhooks rejected on signature",
    )
    .expect("valid metric definition")
});

/// Status class label ("2xx", "4xx", ...) for an upstream status.
pub fn status_class(status: u16) -> &'static str {
    match status {
        100..=199 => "1xx",
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        _ => "5xx",
    }
}

/// Register all metrics with the registry
pub fn register_metrics() -> prometheus::Result<()> {
    REGISTRY.register(Box::new(RELAY_REQUESTS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(UPSTREAM_STATUS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(UPSTREAM_LATENCY.clone()))?;
    REGISTRY.register(Box::new(CHECKOUT_SESSIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(BILLING_EVENTS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(SIGNATURE_FAILURES.clone()))?;
    Ok(())
}
