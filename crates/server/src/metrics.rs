use axum::http::StatusCode;
use once_cell::sync::Lazy;
use prometheus::{register_int_counter_vec, Encoder, IntCounterVec, TextEncoder};

use crate::errors::ApiError;

// Prometheus metrics (default registry)
pub static DS_OPERATIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "delivery_service_operations_total",
        "Delivery service API operations by outcome",
        &["op", "outcome"]
    )
    .expect("register delivery_service_operations_total")
});

/// Count one finished operation; `outcome` is `ok` or the error status code.
pub fn observe<T>(op: &str, res: &Result<T, ApiError>) {
    let outcome = match res {
        Ok(_) => "ok",
        Err(e) => e.status.as_str(),
    };
    DS_OPERATIONS_TOTAL.with_label_values(&[op, outcome]).inc();
}

pub fn encode_metrics() -> (StatusCode, String) {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return (StatusCode::INTERNAL_SERVER_ERROR, format!("metrics encode error: {e}"));
    }
    (StatusCode::OK, String::from_utf8(buffer).unwrap_or_default())
}
