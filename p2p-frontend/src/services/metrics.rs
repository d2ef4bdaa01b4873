use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Duration;

pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder. Safe to call more than once; only the
/// first call installs anything.
pub fn init_metrics() {
    if METRICS_HANDLE.get().is_some() {
        return;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            let _ = METRICS_HANDLE.set(handle);
        }
        Err(e) => tracing::warn!(error = %e, "Prometheus recorder not installed"),
    }
}

pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized\n".to_string())
}

pub fn record_gateway_call(operation: &'static str, success: bool, elapsed: Duration) {
    let outcome = if success { "ok" } else { "error" };
    counter!("gateway_requests_total", "operation" => operation, "outcome" => outcome)
        .increment(1);
    histogram!("gateway_request_duration_seconds", "operation" => operation)
        .record(elapsed.as_secs_f64());
}

pub fn record_transaction_created(currency: &str, method: &str) {
    counter!(
        "p2p_transactions_created_total",
        "currency" => currency.to_string(),
        "method" => method.to_string()
    )
    .increment(1);
}

pub fn record_status_change(status: &str) {
    counter!("p2p_transaction_status_changes_total", "status" => status.to_string()).increment(1);
}
