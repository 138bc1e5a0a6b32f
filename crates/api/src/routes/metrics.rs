//! Prometheus exposition and metric descriptions.

use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use metrics::{describe_counter, Unit};
use metrics_exporter_prometheus::PrometheusHandle;

const PROMETHEUS_TEXT: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Registers help texts for the counters emitted by the domain and event store.
pub fn describe() {
    describe_counter!(
        "mediator_commands_total",
        Unit::Count,
        "Commands sent through the mediator, by command and outcome"
    );
    describe_counter!(
        "mediator_events_published_total",
        Unit::Count,
        "Domain events published, by event type"
    );
    describe_counter!(
        "mediator_event_handler_failures_total",
        Unit::Count,
        "Event handler failures swallowed during publish, by event type"
    );
    describe_counter!(
        "event_store_appends_total",
        Unit::Count,
        "Audit records appended to the event store"
    );
    describe_counter!(
        "event_store_append_failures_total",
        Unit::Count,
        "Audit record appends that failed"
    );
}

/// GET /metrics
pub async fn get(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    ([(CONTENT_TYPE, PROMETHEUS_TEXT)], handle.render())
}
