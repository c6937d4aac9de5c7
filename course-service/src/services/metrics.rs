//! Metrics collection and Prometheus export.
//!
//! Installs the exporter and renders the /metrics body. Until
//! [`init_metrics`] runs, the `metrics` macros are no-ops.

use metrics::counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

/// Global handle to the Prometheus recorder.
pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder.
///
/// Call once at startup before anything is recorded. A second call, or a
/// failure to install, is logged and leaves the existing state untouched.
pub fn init_metrics() {
    if METRICS_HANDLE.get().is_some() {
        tracing::warn!("Metrics recorder already initialized");
        return;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            if METRICS_HANDLE.set(handle).is_err() {
                tracing::warn!("Metrics handle was set concurrently");
            }
        }
        Err(e) => tracing::error!(error = %e, "Failed to install Prometheus recorder"),
    }
}

/// Current metrics in Prometheus text format.
pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized".to_string())
}

/// Count model entries discarded by the recommendation parser.
pub fn record_dropped_recommendations(dropped: usize) {
    if dropped > 0 {
        counter!("recommendations_dropped_total").increment(dropped as u64);
    }
}

/// Count model replies that held no usable JSON.
pub fn record_unparseable_reply() {
    counter!("recommendations_unparseable_total").increment(1);
}
