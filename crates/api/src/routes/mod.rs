//! HTTP route handlers.

pub mod audit;
pub mod clients;
pub mod health;
pub mod metrics;
pub mod persisted_grants;
pub mod resources;

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::response::Response;
use common::EntityId;
use domain::notification::codes;
use domain::{Command, DomainNotification, Mediator, RequestContext};
use event_store::EventStore;
use serde::Serialize;

use crate::error::ApiError;
use crate::response::shape;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub mediator: Arc<Mediator>,
    pub event_store: Arc<dyn EventStore>,
}

#[derive(Serialize)]
struct EntityRef {
    id: EntityId,
}

/// Sends `command` and shapes the response from the request's notifications.
///
/// A request that could not be turned into a command is reported as an
/// `invalid_request` notification through the same shaping.
pub(crate) async fn dispatch<C: Command>(
    state: &AppState,
    mut ctx: RequestContext,
    command: Result<C, String>,
) -> Result<Response, ApiError> {
    let outcome = match command {
        Ok(command) => Some(state.mediator.send(&mut ctx, command).await?),
        Err(reason) => {
            state
                .mediator
                .notify(&mut ctx, DomainNotification::new(codes::INVALID_REQUEST, reason));
            None
        }
    };

    let data = outcome
        .and_then(|o| o.entity_id())
        .map(|id| EntityRef { id });
    Ok(shape(&state.mediator, &ctx, data))
}

pub(crate) fn parse_id(raw: &str) -> Result<EntityId, String> {
    raw.parse()
        .map_err(|_| format!("'{raw}' is not a valid identifier"))
}

pub(crate) fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, String> {
    body.map(|Json(value)| value).map_err(|e| e.body_text())
}
