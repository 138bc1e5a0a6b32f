use chrono::{DateTime, Utc};

use crate::{EntityId, EventStoreRecord, PrincipalId};

/// Filter over stored records.
///
/// Used by audit tooling to answer "what did this principal change, and
/// when". All set criteria must match; time bounds are inclusive.
#[derive(Debug, Clone, Default)]
pub struct RecordQuery {
    /// Filter by acting principal.
    pub principal_id: Option<PrincipalId>,

    /// Filter by entity.
    pub entity_id: Option<EntityId>,

    /// Filter by entity type.
    pub entity_type: Option<String>,

    /// Filter by event types (any of these types).
    pub event_types: Option<Vec<String>>,

    /// Filter by records at or after this timestamp.
    pub from_timestamp: Option<DateTime<Utc>>,

    /// Filter by records at or before this timestamp.
    pub to_timestamp: Option<DateTime<Utc>>,

    /// Maximum number of records to return.
    pub limit: Option<usize>,

    /// Number of records to skip.
    pub offset: Option<usize>,
}

impl RecordQuery {
    /// Creates a new empty query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a query for everything a principal caused.
    pub fn for_principal(principal_id: PrincipalId) -> Self {
        Self {
            principal_id: Some(principal_id),
            ..Default::default()
        }
    }

    /// Creates a query for the history of one entity.
    pub fn for_entity(entity_id: EntityId) -> Self {
        Self {
            entity_id: Some(entity_id),
            ..Default::default()
        }
    }

    pub fn principal_id(mut self, id: PrincipalId) -> Self {
        self.principal_id = Some(id);
        self
    }

    pub fn entity_type(mut self, entity_type: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type.into());
        self
    }

    pub fn event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_types = Some(vec![event_type.into()]);
        self
    }

    pub fn event_types(mut self, event_types: Vec<String>) -> Self {
        self.event_types = Some(event_types);
        self
    }

    /// Restricts to an inclusive time range; either bound may be open.
    pub fn between(mut self, from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Self {
        self.from_timestamp = from;
        self.to_timestamp = to;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Returns true if the record satisfies every filter (limit/offset aside).
    pub fn matches(&self, record: &EventStoreRecord) -> bool {
        if let Some(id) = self.principal_id
            && record.principal_id != id
        {
            return false;
        }
        if let Some(id) = self.entity_id
            && record.entity_id != id
        {
            return false;
        }
        if let Some(ref entity_type) = self.entity_type
            && &record.entity_type != entity_type
        {
            return false;
        }
        if let Some(ref types) = self.event_types
            && !types.contains(&record.event_type)
        {
            return false;
        }
        if let Some(from) = self.from_timestamp
            && record.timestamp < from
        {
            return false;
        }
        if let Some(to) = self.to_timestamp
            && record.timestamp > to
        {
            return false;
        }
        true
    }
}
