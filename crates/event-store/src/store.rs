use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{EntityId, EventStoreError, EventStoreRecord, PrincipalId, RecordQuery, Result};

/// Core trait for event store implementations.
///
/// An event store is an append-only sink: records go in once and are never
/// mutated or deleted. Implementations are shared across all requests and
/// must be thread-safe (Send + Sync); a single append must be atomic.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Appends one record.
    ///
    /// Fails with `DuplicateRecord` if a record with the same id already exists.
    async fn append(&self, record: EventStoreRecord) -> Result<()>;

    /// Retrieves records matching a query, ordered by timestamp then record id.
    async fn query(&self, query: RecordQuery) -> Result<Vec<EventStoreRecord>>;

    /// Returns the total number of stored records.
    async fn count(&self) -> Result<u64>;
}

/// Extension trait providing convenience methods for event stores.
#[async_trait]
pub trait EventStoreExt: EventStore {
    /// Records caused by a principal within an inclusive time range.
    async fn query_by_principal(
        &self,
        principal_id: PrincipalId,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<EventStoreRecord>> {
        self.query(RecordQuery::for_principal(principal_id).between(from, to))
            .await
    }

    /// The audit trail of a single entity, oldest first.
    async fn history_for_entity(&self, entity_id: EntityId) -> Result<Vec<EventStoreRecord>> {
        self.query(RecordQuery::for_entity(entity_id)).await
    }
}

// Blanket implementation for all EventStore implementations
impl<T: EventStore + ?Sized> EventStoreExt for T {}

/// Validates a record before appending.
pub fn validate_record_for_append(record: &EventStoreRecord) -> Result<()> {
    if record.event_type.trim().is_empty() {
        return Err(EventStoreError::InvalidRecord(
            "event_type must not be empty".to_string(),
        ));
    }
    if record.entity_type.trim().is_empty() {
        return Err(EventStoreError::InvalidRecord(
            "entity_type must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// Sorts records into query order and applies offset/limit.
pub(crate) fn paginate(
    mut records: Vec<EventStoreRecord>,
    query: &RecordQuery,
) -> Vec<EventStoreRecord> {
    records.sort_by(|a, b| {
        a.timestamp
            .cmp(&b.timestamp)
            .then(a.record_id.cmp(&b.record_id))
    });

    let offset = query.offset.unwrap_or(0);
    let records = records.into_iter().skip(offset);

    match query.limit {
        Some(limit) => records.take(limit).collect(),
        None => records.collect(),
    }
}
