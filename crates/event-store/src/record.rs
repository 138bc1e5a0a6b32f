use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EntityId, EventStoreError, PrincipalId};

/// Unique identifier for a stored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(Uuid);

impl RecordId {
    /// Creates a new random record ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a record ID from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for RecordId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// The kind of mutation a domain event reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Created,
    Updated,
    Removed,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Created => "Created",
            EventKind::Updated => "Updated",
            EventKind::Removed => "Removed",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EventKind {
    type Err = EventStoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Created" => Ok(EventKind::Created),
            "Updated" => Ok(EventKind::Updated),
            "Removed" => Ok(EventKind::Removed),
            other => Err(EventStoreError::InvalidRecord(format!(
                "unknown event kind '{other}'"
            ))),
        }
    }
}

/// A persisted domain event.
///
/// Holds the serialized event together with the identity of the principal
/// that caused it. Records are write-once: the store never updates or
/// deletes them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventStoreRecord {
    /// Unique identifier for this record.
    pub record_id: RecordId,

    /// The type of the event (e.g., "CreatedClientStoreEvent").
    pub event_type: String,

    /// Whether the entity was created, updated or removed.
    pub event_kind: EventKind,

    /// The entity the event is about.
    pub entity_id: EntityId,

    /// The type of entity (e.g., "ClientStore").
    pub entity_type: String,

    /// The principal on whose behalf the mutation ran.
    pub principal_id: PrincipalId,

    /// Display name of that principal at the time of the mutation.
    pub principal_name: String,

    /// When the record was created.
    pub timestamp: DateTime<Utc>,

    /// The event payload as JSON.
    pub payload: serde_json::Value,

    /// Additional metadata (request id, ...).
    pub metadata: HashMap<String, serde_json::Value>,
}

impl EventStoreRecord {
    /// Creates a new record builder.
    pub fn builder() -> EventStoreRecordBuilder {
        EventStoreRecordBuilder::default()
    }
}

/// Builder for constructing event store records.
#[derive(Debug, Default)]
pub struct EventStoreRecordBuilder {
    record_id: Option<RecordId>,
    event_type: Option<String>,
    event_kind: Option<EventKind>,
    entity_id: Option<EntityId>,
    entity_type: Option<String>,
    principal_id: Option<PrincipalId>,
    principal_name: Option<String>,
    timestamp: Option<DateTime<Utc>>,
    payload: Option<serde_json::Value>,
    metadata: HashMap<String, serde_json::Value>,
}

impl EventStoreRecordBuilder {
    /// Sets the record ID. If not set, a new ID will be generated.
    pub fn record_id(mut self, id: RecordId) -> Self {
        self.record_id = Some(id);
        self
    }

    pub fn event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = Some(event_type.into());
        self
    }

    pub fn event_kind(mut self, kind: EventKind) -> Self {
        self.event_kind = Some(kind);
        self
    }

    pub fn entity_id(mut self, id: EntityId) -> Self {
        self.entity_id = Some(id);
        self
    }

    pub fn entity_type(mut self, entity_type: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type.into());
        self
    }

    /// Stamps the record with the acting principal.
    pub fn principal(mut self, id: PrincipalId, name: impl Into<String>) -> Self {
        self.principal_id = Some(id);
        self.principal_name = Some(name.into());
        self
    }

    /// Sets the timestamp. If not set, the current time will be used.
    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Sets the payload from a serializable value.
    pub fn payload<T: Serialize>(mut self, payload: &T) -> Result<Self, serde_json::Error> {
        self.payload = Some(serde_json::to_value(payload)?);
        Ok(self)
    }

    /// Sets the payload from a raw JSON value.
    pub fn payload_raw(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Adds a metadata entry.
    pub fn metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Builds the record, failing with `InvalidRecord` naming the first missing field.
    pub fn build(self) -> Result<EventStoreRecord, EventStoreError> {
        fn required<T>(value: Option<T>, field: &str) -> Result<T, EventStoreError> {
            value.ok_or_else(|| EventStoreError::InvalidRecord(format!("{field} is required")))
        }

        Ok(EventStoreRecord {
            record_id: self.record_id.unwrap_or_default(),
            event_type: required(self.event_type, "event_type")?,
            event_kind: required(self.event_kind, "event_kind")?,
            entity_id: required(self.entity_id, "entity_id")?,
            entity_type: required(self.entity_type, "entity_type")?,
            principal_id: required(self.principal_id, "principal_id")?,
            principal_name: self.principal_name.unwrap_or_default(),
            timestamp: self.timestamp.unwrap_or_else(Utc::now),
            payload: required(self.payload, "payload")?,
            metadata: self.metadata,
        })
    }
}
