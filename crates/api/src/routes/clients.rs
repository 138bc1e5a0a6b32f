//! Client write endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::Response;
use domain::identity::{
    ClientSettings, CreateClientStoreCommand, RemoveClientStoreCommand, UpdateClientStoreCommand,
};

use super::{AppState, dispatch, json_body, parse_id};
use crate::error::ApiError;
use crate::extract::RequestScope;

/// POST /clients
#[tracing::instrument(skip_all)]
pub async fn create(
    State(state): State<Arc<AppState>>,
    RequestScope(ctx): RequestScope,
    body: Result<Json<ClientSettings>, JsonRejection>,
) -> Result<Response, ApiError> {
    let command = json_body(body).map(|settings| CreateClientStoreCommand { settings });
    dispatch(&state, ctx, command).await
}

/// PUT /clients/{id} — replaces every setting of the client.
#[tracing::instrument(skip(state, ctx, body))]
pub async fn update(
    State(state): State<Arc<AppState>>,
    RequestScope(ctx): RequestScope,
    Path(id): Path<String>,
    body: Result<Json<ClientSettings>, JsonRejection>,
) -> Result<Response, ApiError> {
    let command = parse_id(&id).and_then(|id| {
        json_body(body).map(|settings| UpdateClientStoreCommand { id, settings })
    });
    dispatch(&state, ctx, command).await
}

/// DELETE /clients/{id}
#[tracing::instrument(skip(state, ctx))]
pub async fn remove(
    State(state): State<Arc<AppState>>,
    RequestScope(ctx): RequestScope,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let command = parse_id(&id).map(|id| RemoveClientStoreCommand { id });
    dispatch(&state, ctx, command).await
}
