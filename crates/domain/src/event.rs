//! Domain events raised after successful writes.

use chrono::{DateTime, Utc};
use common::EntityId;
use serde::{Deserialize, Serialize};

use crate::entity::Entity;

pub use event_store::EventKind;

/// A fact that a mutation occurred.
///
/// Events are published only after the corresponding write has succeeded.
pub trait DomainEvent: Serialize + Send + Sync + 'static {
    /// The entity type the event is about.
    type Entity: Entity;

    fn kind(&self) -> EventKind;

    fn entity_id(&self) -> EntityId;

    /// Event name, e.g. `CreatedClientStoreEvent`.
    fn event_type(&self) -> String {
        format!("{}{}Event", self.kind(), Self::Entity::ENTITY_TYPE)
    }
}

/// An entity was inserted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "E: Entity")]
pub struct EntityCreated<E> {
    pub entity_id: EntityId,
    pub entity: E,
    pub occurred_at: DateTime<Utc>,
}

impl<E: Entity> EntityCreated<E> {
    pub fn new(entity: E) -> Self {
        Self {
            entity_id: entity.id(),
            entity,
            occurred_at: Utc::now(),
        }
    }
}

impl<E: Entity> DomainEvent for EntityCreated<E> {
    type Entity = E;

    fn kind(&self) -> EventKind {
        EventKind::Created
    }

    fn entity_id(&self) -> EntityId {
        self.entity_id
    }
}

/// An entity was changed. Carries both states so the change can be replayed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "E: Entity")]
pub struct EntityUpdated<E> {
    pub entity_id: EntityId,
    pub previous: E,
    pub entity: E,
    pub occurred_at: DateTime<Utc>,
}

impl<E: Entity> EntityUpdated<E> {
    pub fn new(previous: E, entity: E) -> Self {
        Self {
            entity_id: entity.id(),
            previous,
            entity,
            occurred_at: Utc::now(),
        }
    }
}

impl<E: Entity> DomainEvent for EntityUpdated<E> {
    type Entity = E;

    fn kind(&self) -> EventKind {
        EventKind::Updated
    }

    fn entity_id(&self) -> EntityId {
        self.entity_id
    }
}

/// An entity was removed. The tombstone is the last stored state, if known.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "E: Entity")]
pub struct EntityRemoved<E> {
    pub entity_id: EntityId,
    pub tombstone: Option<E>,
    pub occurred_at: DateTime<Utc>,
}

impl<E: Entity> EntityRemoved<E> {
    pub fn new(entity_id: EntityId, tombstone: Option<E>) -> Self {
        Self {
            entity_id,
            tombstone,
            occurred_at: Utc::now(),
        }
    }
}

impl<E: Entity> DomainEvent for EntityRemoved<E> {
    type Entity = E;

    fn kind(&self) -> EventKind {
        EventKind::Removed
    }

    fn entity_id(&self) -> EntityId {
        self.entity_id
    }
}
