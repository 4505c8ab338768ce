//! Metrics and observability utilities
//!
//! Provides Prometheus metrics with standardized naming conventions for the
//! intake endpoint and the polling worker.

use crate::config::ObservabilityConfig;
use crate::errors::{AppError, Result};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};

/// Metrics prefix for all DeepScout metrics
pub const METRICS_PREFIX: &str = "deepscout";

/// Histogram buckets for report generation latency (in seconds)
///
/// Generation calls a chat model and routinely runs tens of seconds.
pub const GENERATION_BUCKETS: &[f64] = &[
    0.500, // 500ms
    1.000, // 1s
    2.000, // 2s
    5.000, // 5s
    10.00, // 10s
    30.00, // 30s
    60.00, // 1m
    120.0, // 2m
    300.0, // 5m
];

/// Install the Prometheus exporter when a metrics port is configured
pub fn install_exporter(config: &ObservabilityConfig) -> Result<()> {
    if config.metrics_port == 0 {
        return Ok(());
    }

    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], config.metrics_port))
        .set_buckets_for_metric(
            Matcher::Full(format!("{}_generation_duration_seconds", METRICS_PREFIX)),
            GENERATION_BUCKETS,
        )
        .map_err(|e| AppError::Configuration {
            message: format!("Failed to configure metrics exporter: {}", e),
        })?
        .install()
        .map_err(|e| AppError::Configuration {
            message: format!("Failed to install metrics exporter: {}", e),
        })?;

    tracing::info!(port = config.metrics_port, "Prometheus exporter listening");
    Ok(())
}

/// Register all metric descriptions
pub fn register_metrics() {
    // Intake metrics
    describe_counter!(
        format!("{}_research_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Research requests received, labeled by outcome"
    );

    // Worker cycle metrics
    describe_counter!(
        format!("{}_worker_cycles_total", METRICS_PREFIX),
        Unit::Count,
        "Polling cycles executed"
    );

    describe_histogram!(
        format!("{}_worker_cycle_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Wall time of a full polling cycle"
    );

    describe_gauge!(
        format!("{}_requests_pending", METRICS_PREFIX),
        Unit::Count,
        "Pending requests observed at the start of a cycle"
    );

    describe_counter!(
        format!("{}_requests_claimed_total", METRICS_PREFIX),
        Unit::Count,
        "Requests moved from pending to in_progress"
    );

    describe_counter!(
        format!("{}_requests_completed_total", METRICS_PREFIX),
        Unit::Count,
        "Requests resolved to complete"
    );

    describe_counter!(
        format!("{}_requests_failed_total", METRICS_PREFIX),
        Unit::Count,
        "Requests resolved to error"
    );

    // Generation metrics
    describe_histogram!(
        format!("{}_generation_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Report generation latency in seconds"
    );

    describe_counter!(
        format!("{}_generation_errors_total", METRICS_PREFIX),
        Unit::Count,
        "Report generation failures"
    );

    // Delivery metrics
    describe_counter!(
        format!("{}_notifications_total", METRICS_PREFIX),
        Unit::Count,
        "Report notifications attempted, labeled by status"
    );

    tracing::info!("Metrics registered");
}

/// Record an intake attempt by outcome (queued, rejected, invalid, error)
pub fn record_intake(outcome: &str) {
    counter!(
        format!("{}_research_requests_total", METRICS_PREFIX),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record the pending backlog observed at the start of a cycle
pub fn record_backlog(pending: usize) {
    gauge!(format!("{}_requests_pending", METRICS_PREFIX)).set(pending as f64);
}

/// Record a completed polling cycle
pub fn record_cycle(duration_secs: f64, claimed: u64, completed: u64, failed: u64) {
    counter!(format!("{}_worker_cycles_total", METRICS_PREFIX)).increment(1);

    histogram!(format!("{}_worker_cycle_duration_seconds", METRICS_PREFIX)).record(duration_secs);

    counter!(format!("{}_requests_claimed_total", METRICS_PREFIX)).increment(claimed);
    counter!(format!("{}_requests_completed_total", METRICS_PREFIX)).increment(completed);
    counter!(format!("{}_requests_failed_total", METRICS_PREFIX)).increment(failed);
}

/// Record a report generation attempt
pub fn record_generation(duration_secs: f64, model: &str, success: bool) {
    if success {
        histogram!(
            format!("{}_generation_duration_seconds", METRICS_PREFIX),
            "model" => model.to_string()
        )
        .record(duration_secs);
    } else {
        counter!(
            format!("{}_generation_errors_total", METRICS_PREFIX),
            "model" => model.to_string()
        )
        .increment(1);
    }
}

/// Record a notification attempt
pub fn record_notification(success: bool) {
    let status = if success { "sent" } else { "failed" };

    counter!(
        format!("{}_notifications_total", METRICS_PREFIX),
        "status" => status.to_string()
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_buckets_sorted() {
        let mut prev = 0.0;
        for &bucket in GENERATION_BUCKETS {
            assert!(bucket > prev);
            prev = bucket;
        }
        // Default generation timeout should land inside the buckets
        assert!(GENERATION_BUCKETS.contains(&300.0));
    }

    #[test]
    fn test_record_helpers_run() {
        record_intake("queued");
        record_backlog(3);
        record_cycle(0.05, 3, 2, 1);
        record_generation(1.2, "gpt-4", true);
        record_generation(0.0, "gpt-4", false);
        record_notification(true);
        record_notification(false);
    }

    #[test]
    fn test_descriptions_reach_installed_recorder() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        // Descriptions registered before a recorder exists are silently
        // dropped; binaries must install the exporter first
        metrics::with_local_recorder(&recorder, || {
            register_metrics();
            record_intake("queued");
            record_notification(false);
        });

        let rendered = handle.render();
        assert!(rendered.contains("# HELP deepscout_research_requests_total"));
        assert!(rendered.contains("# TYPE deepscout_research_requests_total counter"));
        assert!(rendered.contains("deepscout_research_requests_total{outcome=\"queued\"}"));
        assert!(rendered.contains("# HELP deepscout_notifications_total"));
    }
}
