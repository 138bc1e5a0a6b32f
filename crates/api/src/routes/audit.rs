//! Audit read endpoint over the event store.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use chrono::{DateTime, Utc};
use common::PrincipalId;
use event_store::{EventStoreExt, EventStoreRecord};
use serde::Deserialize;

use super::AppState;
use crate::error::ApiError;
use crate::response::Envelope;

#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    pub principal_id: PrincipalId,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

/// GET /audit?principal_id=…&from=…&to=… — records caused by one principal,
/// oldest first. Both bounds are inclusive and optional.
#[tracing::instrument(skip_all)]
pub async fn by_principal(
    State(state): State<Arc<AppState>>,
    query: Result<Query<AuditQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::InvalidRequest(e.body_text()))?;
    if let (Some(from), Some(to)) = (query.from, query.to)
        && from > to
    {
        return Err(ApiError::InvalidRequest(
            "'from' must not be later than 'to'".to_string(),
        ));
    }

    let records: Vec<EventStoreRecord> = state
        .event_store
        .query_by_principal(query.principal_id, query.from, query.to)
        .await?;

    tracing::debug!(principal_id = %query.principal_id, records = records.len(), "audit query");
    Ok(Json(Envelope::ok(Some(records))))
}
