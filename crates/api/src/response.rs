//! Turns the notifications of a finished command into an HTTP response.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::{DomainNotification, Mediator, RequestContext};
use serde::Serialize;

/// Body shared by every API response.
#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<DomainNotification>,
}

impl<T: Serialize> Envelope<T> {
    pub fn ok(data: Option<T>) -> Self {
        Self {
            success: true,
            data,
            errors: Vec::new(),
        }
    }
}

impl Envelope<()> {
    pub fn failed(errors: Vec<DomainNotification>) -> Self {
        Self {
            success: false,
            data: None,
            errors,
        }
    }
}

/// `400` listing the request's notifications if there are any, `200` with
/// `data` otherwise.
pub fn shape<T: Serialize>(mediator: &Mediator, ctx: &RequestContext, data: Option<T>) -> Response {
    let collector = mediator.notification_handler(ctx);
    if collector.has_notifications() {
        tracing::debug!(
            request_id = %ctx.request_id(),
            notifications = collector.len(),
            "request rejected"
        );
        let body = Envelope::failed(collector.get_notifications().to_vec());
        return (StatusCode::BAD_REQUEST, Json(body)).into_response();
    }

    if !ctx.publish_failures().is_empty() {
        tracing::warn!(
            request_id = %ctx.request_id(),
            failures = ctx.publish_failures().len(),
            "command succeeded without a complete audit trail"
        );
    }

    (StatusCode::OK, Json(Envelope::ok(data))).into_response()
}
