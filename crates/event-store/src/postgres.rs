use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    EntityId, EventStoreError, EventStoreRecord, PrincipalId, RecordId, RecordQuery, Result,
    store::{EventStore, validate_record_for_append},
};

const SELECT_COLUMNS: &str = "SELECT id, event_type, event_kind, entity_id, entity_type, principal_id, principal_name, timestamp, payload, metadata FROM event_store";

/// PostgreSQL-backed event store implementation.
#[derive(Clone)]
pub struct PostgresEventStore {
    pool: PgPool,
}

impl PostgresEventStore {
    /// Creates a new PostgreSQL event store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to the database at `url`.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = PgPool::connect(url).await.map_err(map_sqlx_error)?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_record(row: PgRow) -> Result<EventStoreRecord> {
        let metadata_json: serde_json::Value = row.try_get("metadata")?;
        let metadata: HashMap<String, serde_json::Value> = serde_json::from_value(metadata_json)?;
        let event_kind: String = row.try_get("event_kind")?;

        Ok(EventStoreRecord {
            record_id: RecordId::from_uuid(row.try_get::<Uuid, _>("id")?),
            event_type: row.try_get("event_type")?,
            event_kind: event_kind.parse()?,
            entity_id: EntityId::from_uuid(row.try_get::<Uuid, _>("entity_id")?),
            entity_type: row.try_get("entity_type")?,
            principal_id: PrincipalId::from_uuid(row.try_get::<Uuid, _>("principal_id")?),
            principal_name: row.try_get("principal_name")?,
            timestamp: row.try_get("timestamp")?,
            payload: row.try_get("payload")?,
            metadata,
        })
    }
}

/// Connection-level failures become `Unavailable`; everything else stays a
/// database error.
fn map_sqlx_error(e: sqlx::Error) -> EventStoreError {
    match e {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            EventStoreError::Unavailable(e.to_string())
        }
        other => EventStoreError::Database(other),
    }
}

#[async_trait]
impl EventStore for PostgresEventStore {
    #[tracing::instrument(skip(self, record), fields(event_type = %record.event_type, record_id = %record.record_id))]
    async fn append(&self, record: EventStoreRecord) -> Result<()> {
        validate_record_for_append(&record)?;

        let metadata_json = serde_json::to_value(&record.metadata)?;
        let record_id = record.record_id;

        sqlx::query(
            r#"
            INSERT INTO event_store (id, event_type, event_kind, entity_id, entity_type, principal_id, principal_name, timestamp, payload, metadata)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(record.record_id.as_uuid())
        .bind(&record.event_type)
        .bind(record.event_kind.as_str())
        .bind(record.entity_id.as_uuid())
        .bind(&record.entity_type)
        .bind(record.principal_id.as_uuid())
        .bind(&record.principal_name)
        .bind(record.timestamp)
        .bind(&record.payload)
        .bind(metadata_json)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            metrics::counter!("event_store_append_failures_total").increment(1);
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return EventStoreError::DuplicateRecord(record_id);
            }
            tracing::warn!(error = %e, %record_id, "event store append failed");
            map_sqlx_error(e)
        })?;

        metrics::counter!("event_store_appends_total").increment(1);
        Ok(())
    }

    async fn query(&self, query: RecordQuery) -> Result<Vec<EventStoreRecord>> {
        let mut builder = sqlx::QueryBuilder::<sqlx::Postgres>::new(SELECT_COLUMNS);
        builder.push(" WHERE 1=1");

        if let Some(id) = query.principal_id {
            builder.push(" AND principal_id = ").push_bind(id.as_uuid());
        }
        if let Some(id) = query.entity_id {
            builder.push(" AND entity_id = ").push_bind(id.as_uuid());
        }
        if let Some(entity_type) = query.entity_type {
            builder.push(" AND entity_type = ").push_bind(entity_type);
        }
        if let Some(event_types) = query.event_types {
            builder
                .push(" AND event_type = ANY(")
                .push_bind(event_types)
                .push(")");
        }
        if let Some(from) = query.from_timestamp {
            builder.push(" AND timestamp >= ").push_bind(from);
        }
        if let Some(to) = query.to_timestamp {
            builder.push(" AND timestamp <= ").push_bind(to);
        }

        builder.push(" ORDER BY timestamp ASC, id ASC");

        if let Some(limit) = query.limit {
            builder.push(" LIMIT ").push_bind(limit as i64);
        }
        if let Some(offset) = query.offset {
            builder.push(" OFFSET ").push_bind(offset as i64);
        }

        let rows = builder
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        rows.into_iter().map(Self::row_to_record).collect()
    }

    async fn count(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM event_store")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(count as u64)
    }
}
