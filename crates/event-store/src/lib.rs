//! Append-only event store for domain events raised by the identity write core.
//!
//! Every record is stamped with the principal that caused it and is never
//! mutated or deleted once appended.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod record;
pub mod store;

pub use common::{EntityId, PrincipalId};
pub use error::{EventStoreError, Result};
pub use memory::InMemoryEventStore;
pub use postgres::PostgresEventStore;
pub use query::RecordQuery;
pub use record::{EventKind, EventStoreRecord, EventStoreRecordBuilder, RecordId};
pub use store::{EventStore, EventStoreExt};
