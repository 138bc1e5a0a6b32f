//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p event-store --test postgres_integration -- --test-threads=1
//! ```

use std::sync::Arc;

use chrono::{Duration, Utc};
use event_store::{
    EntityId, EventKind, EventStore, EventStoreError, EventStoreExt, EventStoreRecord,
    PostgresEventStore, PrincipalId, RecordQuery,
};
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();

            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_event_store_table.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();

            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and a cleared table
async fn get_test_store() -> PostgresEventStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE event_store")
        .execute(&pool)
        .await
        .unwrap();

    PostgresEventStore::new(pool)
}

fn create_test_record(principal_id: PrincipalId, entity_id: EntityId) -> EventStoreRecord {
    EventStoreRecord::builder()
        .event_type("CreatedClientStoreEvent")
        .event_kind(EventKind::Created)
        .entity_id(entity_id)
        .entity_type("ClientStore")
        .principal(principal_id, "integration")
        .payload_raw(serde_json::json!({"client_id": "abc"}))
        .metadata("request_id", serde_json::json!("req-42"))
        .build()
        .unwrap()
}

#[tokio::test]
async fn append_and_query_record() {
    let store = get_test_store().await;
    let principal = PrincipalId::new();
    let entity = EntityId::new();

    store
        .append(create_test_record(principal, entity))
        .await
        .unwrap();

    let records = store.query_by_principal(principal, None, None).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].entity_id, entity);
    assert_eq!(records[0].event_kind, EventKind::Created);
    assert_eq!(records[0].principal_name, "integration");
    assert_eq!(
        records[0].metadata.get("request_id"),
        Some(&serde_json::json!("req-42"))
    );
}

#[tokio::test]
async fn duplicate_record_is_rejected() {
    let store = get_test_store().await;
    let record = create_test_record(PrincipalId::new(), EntityId::new());
    let id = record.record_id;

    store.append(record.clone()).await.unwrap();
    let result = store.append(record).await;

    assert!(matches!(result, Err(EventStoreError::DuplicateRecord(dup)) if dup == id));
    assert_eq!(store.count().await.unwrap(), 1);
}

#[tokio::test]
async fn query_respects_time_range() {
    let store = get_test_store().await;
    let principal = PrincipalId::new();
    let now = Utc::now();

    let mut old = create_test_record(principal, EntityId::new());
    old.timestamp = now - Duration::days(1);
    store.append(old).await.unwrap();
    store
        .append(create_test_record(principal, EntityId::new()))
        .await
        .unwrap();

    let recent = store
        .query_by_principal(principal, Some(now - Duration::hours(1)), None)
        .await
        .unwrap();
    assert_eq!(recent.len(), 1);

    let older = store
        .query_by_principal(principal, None, Some(now - Duration::hours(1)))
        .await
        .unwrap();
    assert_eq!(older.len(), 1);
}

#[tokio::test]
async fn query_filters_by_event_type_with_pagination() {
    let store = get_test_store().await;
    let principal = PrincipalId::new();
    let entity = EntityId::new();
    let base = Utc::now();

    for i in 0..4 {
        let mut record = create_test_record(principal, entity);
        record.timestamp = base + Duration::seconds(i);
        store.append(record).await.unwrap();
    }

    let page = store
        .query(
            RecordQuery::for_entity(entity)
                .event_type("CreatedClientStoreEvent")
                .offset(1)
                .limit(2),
        )
        .await
        .unwrap();

    assert_eq!(page.len(), 2);
    assert!(page[0].timestamp < page[1].timestamp);

    let history = store.history_for_entity(entity).await.unwrap();
    assert_eq!(history.len(), 4);
}
