use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder. Safe to call more than once in a process
/// (test binaries spawn several applications).
pub fn init_metrics() {
    if METRICS_HANDLE.get().is_some() {
        return;
    }
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            let _ = METRICS_HANDLE.set(handle);
        }
        Err(e) => {
            tracing::debug!("Prometheus recorder already installed: {}", e);
        }
    }
}

pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized\n".to_string())
}

/// Record an intake outcome.
pub fn record_code_saved(store_saved: bool) {
    metrics::counter!(
        "payment_codes_saved_total",
        "store_saved" => if store_saved { "true" } else { "false" }
    )
    .increment(1);
}

/// Record a confirmation outcome.
pub fn record_confirmation(outcome: &'static str) {
    metrics::counter!("payment_confirmations_total", "outcome" => outcome).increment(1);
}
