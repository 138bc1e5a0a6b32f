//! Resource write endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::Response;
use domain::identity::{
    CreateResourcesStoreCommand, RemoveResourcesStoreCommand, ResourceSettings,
    UpdateResourcesStoreCommand,
};

use super::{AppState, dispatch, json_body, parse_id};
use crate::error::ApiError;
use crate::extract::RequestScope;

#[tracing::instrument(skip_all)]
pub async fn create(
    State(state): State<Arc<AppState>>,
    RequestScope(ctx): RequestScope,
    body: Result<Json<ResourceSettings>, JsonRejection>,
) -> Result<Response, ApiError> {
    let command = json_body(body).map(|settings| CreateResourcesStoreCommand { settings });
    dispatch(&state, ctx, command).await
}

#[tracing::instrument(skip(state, ctx, body))]
pub async fn update(
    State(state): State<Arc<AppState>>,
    RequestScope(ctx): RequestScope,
    Path(id): Path<String>,
    body: Result<Json<ResourceSettings>, JsonRejection>,
) -> Result<Response, ApiError> {
    let command = parse_id(&id).and_then(|id| {
        json_body(body).map(|settings| UpdateResourcesStoreCommand { id, settings })
    });
    dispatch(&state, ctx, command).await
}

#[tracing::instrument(skip(state, ctx))]
pub async fn remove(
    State(state): State<Arc<AppState>>,
    RequestScope(ctx): RequestScope,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let command = parse_id(&id).map(|id| RemoveResourcesStoreCommand { id });
    dispatch(&state, ctx, command).await
}
