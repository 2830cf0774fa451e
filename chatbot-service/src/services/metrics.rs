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

/// Count an inbound webhook message.
pub fn record_inbound(kind: &'static str) {
    metrics::counter!("webhook_messages_total", "kind" => kind).increment(1);
}

/// Count a QR issuance outcome.
pub fn record_qr_issued(outcome: &'static str) {
    metrics::counter!("qr_issuance_total", "outcome" => outcome).increment(1);
}
