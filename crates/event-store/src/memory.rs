use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    EventStoreError, EventStoreRecord, RecordId, RecordQuery, Result,
    store::{EventStore, paginate, validate_record_for_append},
};

/// In-memory event store implementation for tests and single-node setups.
///
/// Provides the same interface and write-once guarantee as the PostgreSQL
/// implementation.
#[derive(Clone, Default)]
pub struct InMemoryEventStore {
    records: Arc<RwLock<Log>>,
}

/// Records in append order plus the ids already taken.
#[derive(Default)]
struct Log {
    records: Vec<EventStoreRecord>,
    ids: HashSet<RecordId>,
}

impl InMemoryEventStore {
    /// Creates a new empty in-memory event store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of records stored.
    pub async fn record_count(&self) -> usize {
        self.records.read().await.records.len()
    }

    /// Returns every record in append order.
    pub async fn all_records(&self) -> Vec<EventStoreRecord> {
        self.records.read().await.records.clone()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    #[tracing::instrument(skip(self, record), fields(event_type = %record.event_type, record_id = %record.record_id))]
    async fn append(&self, record: EventStoreRecord) -> Result<()> {
        validate_record_for_append(&record)?;

        let mut log = self.records.write().await;

        if !log.ids.insert(record.record_id) {
            metrics::counter!("event_store_append_failures_total").increment(1);
            return Err(EventStoreError::DuplicateRecord(record.record_id));
        }

        log.records.push(record);
        metrics::counter!("event_store_appends_total").increment(1);
        Ok(())
    }

    async fn query(&self, query: RecordQuery) -> Result<Vec<EventStoreRecord>> {
        let log = self.records.read().await;
        let records: Vec<_> = log
            .records
            .iter()
            .filter(|r| query.matches(r))
            .cloned()
            .collect();
        Ok(paginate(records, &query))
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.records.read().await.records.len() as u64)
    }
}
