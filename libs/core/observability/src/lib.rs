//! Prometheus metrics for the imagery cost estimator.
//!
//! This crate provides:
//! - a process-wide Prometheus recorder and the `/metrics` handler
//! - estimation and catalog metrics ([`EstimationMetrics`])
//! - an axum middleware recording per-route HTTP metrics
//!
//! # Example
//!
//! ```rust,ignore
//! use observability::{init_metrics, metrics_handler, EstimationMetrics};
//!
//! init_metrics()?;
//! EstimationMetrics::record_catalog_loaded(27);
//!
//! let app = Router::new()
//!     .route("/metrics", get(metrics_handler));
//! ```

pub mod estimation;
pub mod middleware;

pub use estimation::EstimationMetrics;
pub use middleware::metrics_middleware;

pub use metrics::{counter, gauge, histogram};
pub use metrics_exporter_prometheus::BuildError;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use tracing::info;

static METRICS_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Install the Prometheus recorder. Later calls return the same handle.
pub fn init_metrics() -> Result<&'static PrometheusHandle, BuildError> {
    METRICS_HANDLE.get_or_try_init(|| {
        let handle = PrometheusBuilder::new().install_recorder()?;

        info!("Prometheus metrics recorder initialized");
        register_metric_descriptions();

        Ok(handle)
    })
}

pub fn get_metrics_handle() -> Option<&'static PrometheusHandle> {
    METRICS_HANDLE.get()
}

/// Axum handler for /metrics endpoint
pub async fn metrics_handler() -> String {
    match get_metrics_handle() {
        Some(handle) => handle.render(),
        None => "# Metrics not initialized\n".to_string(),
    }
}

fn register_metric_descriptions() {
    use metrics::{describe_counter, describe_gauge, describe_histogram};

    // HTTP
    describe_counter!("http_requests_total", "Total number of HTTP requests");
    describe_histogram!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds"
    );

    // Estimation
    describe_counter!(
        "estimations_total",
        "Cost estimations by outcome (ok or the rejection kind)"
    );
    describe_histogram!(
        "estimation_duration_seconds",
        "Time spent computing one estimate"
    );
    describe_histogram!("estimated_credits", "Total credits of successful estimates");
    describe_histogram!(
        "estimation_area_square_meters",
        "Area of interest of successful estimates"
    );

    // Catalog
    describe_counter!("catalog_reloads_total", "Pricing catalog reloads by outcome");
    describe_gauge!("catalog_entries", "Pricing rules in the active catalog");
}
