//! Persisted grants: authorization codes, refresh tokens, consents.

use chrono::{DateTime, Utc};
use common::EntityId;
use serde::{Deserialize, Serialize};

use crate::command::{Command, CreateCommand, RemoveCommand, UpdateCommand, Validation};
use crate::entity::Entity;

/// Fields supplied when a grant is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPersistedGrant {
    pub key: String,
    #[serde(rename = "type")]
    pub grant_type: String,
    #[serde(default)]
    pub subject_id: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    pub client_id: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "Utc::now")]
    pub creation_time: DateTime<Utc>,
    #[serde(default)]
    pub expiration: Option<DateTime<Utc>>,
    #[serde(default)]
    pub consumed_time: Option<DateTime<Utc>>,
    pub data: String,
    #[serde(default = "active")]
    pub is_active: bool,
}

fn active() -> bool {
    true
}

fn check_consumed(
    v: &mut Validation,
    consumed_time: Option<DateTime<Utc>>,
    expiration: Option<DateTime<Utc>>,
) {
    if let (Some(consumed), Some(expiration)) = (consumed_time, expiration) {
        v.ensure(
            consumed <= expiration,
            "Consumed time must not be after the expiration",
        );
    }
}

fn check_expiration(
    v: &mut Validation,
    creation_time: DateTime<Utc>,
    expiration: Option<DateTime<Utc>>,
) {
    if let Some(expiration) = expiration {
        v.ensure(
            expiration > creation_time,
            "Expiration must be later than the creation time",
        );
    }
}

impl NewPersistedGrant {
    pub fn validate(&self) -> Validation {
        let mut v = Validation::new();
        v.ensure(!self.key.trim().is_empty(), "Grant key is required")
            .ensure(!self.grant_type.trim().is_empty(), "Grant type is required")
            .ensure(!self.client_id.trim().is_empty(), "Client id is required")
            .ensure(!self.data.is_empty(), "Grant data is required");
        check_expiration(&mut v, self.creation_time, self.expiration);
        check_consumed(&mut v, self.consumed_time, self.expiration);
        v
    }
}

/// A stored grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedGrantStore {
    pub id: EntityId,
    pub key: String,
    #[serde(rename = "type")]
    pub grant_type: String,
    pub subject_id: Option<String>,
    pub session_id: Option<String>,
    pub client_id: String,
    pub description: Option<String>,
    pub creation_time: DateTime<Utc>,
    pub expiration: Option<DateTime<Utc>>,
    pub consumed_time: Option<DateTime<Utc>>,
    pub data: String,
    pub is_active: bool,
}

impl Entity for PersistedGrantStore {
    const ENTITY_TYPE: &'static str = "PersistedGrantStore";

    fn id(&self) -> EntityId {
        self.id
    }
}

#[derive(Debug, Clone)]
pub struct CreatePersistedGrantStoreCommand {
    pub grant: NewPersistedGrant,
}

impl Command for CreatePersistedGrantStoreCommand {
    const NAME: &'static str = "CreatePersistedGrantStoreCommand";

    fn validate(&self) -> Validation {
        self.grant.validate()
    }
}

impl CreateCommand for CreatePersistedGrantStoreCommand {
    type Entity = PersistedGrantStore;

    fn into_entity(self, id: EntityId) -> PersistedGrantStore {
        let g = self.grant;
        PersistedGrantStore {
            id,
            key: g.key,
            grant_type: g.grant_type,
            subject_id: g.subject_id,
            session_id: g.session_id,
            client_id: g.client_id,
            description: g.description,
            creation_time: g.creation_time,
            expiration: g.expiration,
            consumed_time: g.consumed_time,
            data: g.data,
            is_active: g.is_active,
        }
    }
}

/// The mutable part of a grant. Absent fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistedGrantChanges {
    pub description: Option<String>,
    pub expiration: Option<DateTime<Utc>>,
    pub consumed_time: Option<DateTime<Utc>>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct UpdatePersistedGrantStoreCommand {
    pub id: EntityId,
    pub changes: PersistedGrantChanges,
}

impl Command for UpdatePersistedGrantStoreCommand {
    const NAME: &'static str = "UpdatePersistedGrantStoreCommand";

    fn target_id(&self) -> Option<EntityId> {
        Some(self.id)
    }

    fn validate(&self) -> Validation {
        let mut v = Validation::new();
        let c = &self.changes;
        v.ensure(
            c.description.is_some()
                || c.expiration.is_some()
                || c.consumed_time.is_some()
                || c.is_active.is_some(),
            "At least one grant field must be changed",
        );
        check_consumed(&mut v, c.consumed_time, c.expiration);
        v
    }
}

impl UpdateCommand for UpdatePersistedGrantStoreCommand {
    type Entity = PersistedGrantStore;

    fn apply_to(self, existing: PersistedGrantStore) -> PersistedGrantStore {
        let c = self.changes;
        PersistedGrantStore {
            description: c.description.or(existing.description),
            expiration: c.expiration.or(existing.expiration),
            consumed_time: c.consumed_time.or(existing.consumed_time),
            is_active: c.is_active.unwrap_or(existing.is_active),
            ..existing
        }
    }

    /// Supplied times must still fit the stored creation time and whichever
    /// of expiration or consumed time is kept.
    fn validate_against(&self, existing: &PersistedGrantStore) -> Validation {
        let c = &self.changes;
        let mut v = Validation::new();
        let expiration = c.expiration.or(existing.expiration);
        if c.expiration.is_some() {
            check_expiration(&mut v, existing.creation_time, expiration);
        }
        if c.expiration.is_none() || c.consumed_time.is_none() {
            check_consumed(&mut v, c.consumed_time.or(existing.consumed_time), expiration);
        }
        v
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RemovePersistedGrantStoreCommand {
    pub id: EntityId,
}

impl Command for RemovePersistedGrantStoreCommand {
    const NAME: &'static str = "RemovePersistedGrantStoreCommand";

    fn target_id(&self) -> Option<EntityId> {
        Some(self.id)
    }
}

impl RemoveCommand for RemovePersistedGrantStoreCommand {
    type Entity = PersistedGrantStore;
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn grant() -> NewPersistedGrant {
        let now = Utc::now();
        NewPersistedGrant {
            key: "k1".into(),
            grant_type: "refresh_token".into(),
            subject_id: Some("alice".into()),
            session_id: None,
            client_id: "web".into(),
            description: None,
            creation_time: now,
            expiration: Some(now + Duration::days(1)),
            consumed_time: None,
            data: "{}".into(),
            is_active: true,
        }
    }

    #[test]
    fn valid_grant_passes() {
        assert!(grant().validate().is_valid());
    }

    #[test]
    fn expiration_before_creation_is_rejected() {
        let g = grant();
        let expired = NewPersistedGrant {
            expiration: Some(g.creation_time - Duration::seconds(1)),
            ..g
        };
        assert_eq!(
            expired.validate().failures()[0].message,
            "Expiration must be later than the creation time"
        );
    }

    #[test]
    fn required_fields_are_reported_together() {
        let empty = NewPersistedGrant {
            key: String::new(),
            client_id: String::new(),
            data: String::new(),
            ..grant()
        };
        assert_eq!(empty.validate().failures().len(), 3);
    }

    #[test]
    fn update_changes_only_supplied_fields() {
        let existing = CreatePersistedGrantStoreCommand { grant: grant() }.into_entity(EntityId::new());
        let consumed = Utc::now();

        let updated = UpdatePersistedGrantStoreCommand {
            id: existing.id,
            changes: PersistedGrantChanges {
                consumed_time: Some(consumed),
                is_active: Some(false),
                ..PersistedGrantChanges::default()
            },
        }
        .apply_to(existing.clone());

        assert_eq!(updated.consumed_time, Some(consumed));
        assert!(!updated.is_active);
        assert_eq!(updated.expiration, existing.expiration);
        assert_eq!(updated.key, existing.key);
        assert_eq!(updated.data, existing.data);
    }

    #[test]
    fn empty_update_is_rejected() {
        let command = UpdatePersistedGrantStoreCommand {
            id: EntityId::new(),
            changes: PersistedGrantChanges::default(),
        };
        assert!(!command.is_valid());
    }

    #[test]
    fn update_may_not_expire_before_stored_creation() {
        let existing = CreatePersistedGrantStoreCommand { grant: grant() }.into_entity(EntityId::new());
        let command = UpdatePersistedGrantStoreCommand {
            id: existing.id,
            changes: PersistedGrantChanges {
                expiration: Some(existing.creation_time - Duration::days(30)),
                ..PersistedGrantChanges::default()
            },
        };

        assert!(command.is_valid());
        assert_eq!(
            command.validate_against(&existing).failures()[0].message,
            "Expiration must be later than the creation time"
        );
    }

    #[test]
    fn update_may_not_consume_after_stored_expiration() {
        let existing = CreatePersistedGrantStoreCommand { grant: grant() }.into_entity(EntityId::new());
        let command = UpdatePersistedGrantStoreCommand {
            id: existing.id,
            changes: PersistedGrantChanges {
                consumed_time: existing.expiration.map(|e| e + Duration::hours(1)),
                ..PersistedGrantChanges::default()
            },
        };

        assert_eq!(
            command.validate_against(&existing).failures()[0].message,
            "Consumed time must not be after the expiration"
        );
    }

    #[test]
    fn update_within_stored_bounds_passes() {
        let existing = CreatePersistedGrantStoreCommand { grant: grant() }.into_entity(EntityId::new());
        let command = UpdatePersistedGrantStoreCommand {
            id: existing.id,
            changes: PersistedGrantChanges {
                expiration: Some(existing.creation_time + Duration::days(2)),
                consumed_time: Some(existing.creation_time + Duration::hours(1)),
                ..PersistedGrantChanges::default()
            },
        };

        assert!(command.validate_against(&existing).is_valid());
    }
}
