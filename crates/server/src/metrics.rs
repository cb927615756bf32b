//! Application metrics for Prometheus monitoring.
//!
//! This module provides:
//! - Prometheus metrics recorder initialization
//! - Metric definitions for generate requests and builds
//! - Helper functions for recording metrics
//!
//! Recording before [`init_metrics`] is a no-op.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Duration;

/// Global Prometheus handle for rendering metrics.
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// This should be called once at application startup, before any metrics are recorded.
/// Returns `true` if initialization succeeded, `false` if already initialized.
pub fn init_metrics() -> bool {
    if PROMETHEUS_HANDLE.get().is_some() {
        return false;
    }

    let recorder = PrometheusBuilder::new().build_recorder();
    let handle = recorder.handle();

    if metrics::set_global_recorder(recorder).is_err() {
        tracing::warn!("Failed to set global metrics recorder (already set)");
        return false;
    }

    if PROMETHEUS_HANDLE.set(handle).is_err() {
        tracing::warn!("Failed to store Prometheus handle (already set)");
    }

    describe_metrics();

    tracing::info!("Prometheus metrics initialized");
    true
}

fn describe_metrics() {
    describe_counter!(
        "fontpack_generate_requests_total",
        "Generate requests by outcome (created, deduplicated, invalid)"
    );
    describe_counter!("fontpack_builds_total", "Finished font builds by result");
    describe_histogram!(
        "fontpack_build_duration_seconds",
        "Duration of font builds in seconds"
    );
    describe_gauge!("fontpack_queue_depth", "Builds waiting for a free worker");
}

/// Render current metrics in Prometheus text format.
///
/// Returns `None` if metrics are not initialized.
pub fn render_metrics() -> Option<String> {
    PROMETHEUS_HANDLE.get().map(|h| h.render())
}

/// Record the outcome of a generate request: `created`, `deduplicated` or `invalid`.
pub fn record_generate(outcome: &'static str) {
    counter!("fontpack_generate_requests_total", "outcome" => outcome).increment(1);
}

/// Record a finished build.
pub fn record_build(success: bool, duration: Duration) {
    let result = if success { "ready" } else { "failed" };
    counter!("fontpack_builds_total", "result" => result).increment(1);
    histogram!("fontpack_build_duration_seconds", "result" => result)
        .record(duration.as_secs_f64());
}

pub fn set_queue_depth(depth: usize) {
    gauge!("fontpack_queue_depth").set(depth as f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_generate("created");
        record_build(true, Duration::from_millis(5));
        set_queue_depth(3);
    }

    #[test]
    fn test_init_then_render() {
        init_metrics();
        record_build(false, Duration::from_millis(1));
        let rendered = render_metrics().expect("initialized");
        assert!(rendered.contains("fontpack_builds_total"));
        assert!(!init_metrics());
    }
}
