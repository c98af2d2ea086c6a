//! Observability Metrics
//!
//! Prometheus recorder and the `/metrics` endpoint.

use std::sync::OnceLock;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
};
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use dispatch_agent_core::EmergencyType;

use crate::state::AppState;
use crate::ServerError;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder. Safe to call more than once; later calls
/// return the first handle.
pub fn init_metrics() -> Result<PrometheusHandle, ServerError> {
    if let Some(handle) = METRICS_HANDLE.get() {
        return Ok(handle.clone());
    }

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| ServerError::Internal(format!("failed to install Prometheus recorder: {}", e)))?;

    register_default_metrics();

    Ok(METRICS_HANDLE.get_or_init(|| handle).clone())
}

fn register_default_metrics() {
    for event in ["call_started", "call_ended", "call_analyzed", "unknown"] {
        counter!("dispatch_agent_webhook_events_total", "event" => event).absolute(0);
    }
    counter!("dispatch_agent_partial_summaries_total").absolute(0);
    counter!("dispatch_agent_persistence_failures_total").absolute(0);
    histogram!("dispatch_agent_extraction_duration_seconds").record(0.0);
}

pub fn record_webhook_event(event: &'static str) {
    counter!("dispatch_agent_webhook_events_total", "event" => event).increment(1);
}

pub fn record_emergency(emergency_type: EmergencyType) {
    counter!("dispatch_agent_emergencies_detected_total", "type" => emergency_type.as_str()).increment(1);
}

/// `GET /metrics`
pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    match state.metrics.as_ref() {
        Some(handle) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        ),
        None => (
            StatusCode::NOT_FOUND,
            [(header::CONTENT_TYPE, "text/plain")],
            "metrics disabled".to_string(),
        ),
    }
}
