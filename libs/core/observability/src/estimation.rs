//! Estimation and pricing catalog metrics.

use metrics::{counter, gauge, histogram};
use std::time::Duration;

/// Estimation metrics recorder
pub struct EstimationMetrics;

impl EstimationMetrics {
    /// Record a successful estimate
    pub fn record_estimation(
        capture_mode: &str,
        resources: usize,
        area_square_meters: f64,
        credits: f64,
        duration: Duration,
    ) {
        counter!("estimations_total", "outcome" => "ok").increment(1);
        histogram!("estimation_duration_seconds").record(duration.as_secs_f64());
        histogram!("estimated_credits", "capture_mode" => capture_mode.to_string()).record(credits);
        histogram!("estimation_area_square_meters").record(area_square_meters);

        tracing::debug!(
            capture_mode,
            resources,
            area_square_meters,
            credits,
            duration_us = duration.as_micros() as u64,
            "Estimation recorded"
        );
    }

    /// Record a rejected estimate, labelled with the error kind
    pub fn record_rejection(kind: &'static str, duration: Duration) {
        counter!("estimations_total", "outcome" => kind).increment(1);
        histogram!("estimation_duration_seconds").record(duration.as_secs_f64());
    }

    pub fn record_catalog_loaded(entries: usize) {
        gauge!("catalog_entries").set(entries as f64);
    }

    pub fn record_catalog_reload(success: bool) {
        let outcome = if success { "success" } else { "failure" };
        counter!("catalog_reloads_total", "outcome" => outcome).increment(1);
    }
}
