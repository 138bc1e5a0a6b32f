//! HTTP write API for identity configuration.
//!
//! Provides REST endpoints that turn requests into commands on the
//! mediation core and shape the accumulated notifications into responses,
//! plus an audit read endpoint, with structured logging (tracing) and
//! Prometheus metrics.

pub mod config;
pub mod error;
pub mod extract;
pub mod response;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use domain::identity::{self, IdentityRepositories};
use domain::{DomainError, Mediator};
use event_store::EventStore;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use routes::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/clients", post(routes::clients::create))
        .route(
            "/clients/{id}",
            put(routes::clients::update).delete(routes::clients::remove),
        )
        .route("/resources", post(routes::resources::create))
        .route(
            "/resources/{id}",
            put(routes::resources::update).delete(routes::resources::remove),
        )
        .route("/persisted-grants", post(routes::persisted_grants::create))
        .route(
            "/persisted-grants/{id}",
            put(routes::persisted_grants::update).delete(routes::persisted_grants::remove),
        )
        .route("/audit", get(routes::audit::by_principal))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Wires the identity mediator over in-memory repositories and `event_store`.
///
/// Fails if the handler registrations are incomplete or ambiguous, so a
/// miswired build never starts serving.
pub fn create_default_state(event_store: Arc<dyn EventStore>) -> Result<Arc<AppState>, DomainError> {
    let repositories = IdentityRepositories::in_memory();
    let mediator = identity::register(Mediator::builder(), &repositories, Arc::clone(&event_store))
        .build()?;

    Ok(Arc::new(AppState {
        mediator: Arc::new(mediator),
        event_store,
    }))
}
