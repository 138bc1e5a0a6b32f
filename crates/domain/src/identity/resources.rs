//! Identity resources, API resources and API scopes.

use std::collections::BTreeMap;

use common::EntityId;
use serde::{Deserialize, Serialize};

use crate::command::{Command, CreateCommand, RemoveCommand, UpdateCommand, Validation};
use crate::entity::Entity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    #[default]
    IdentityResource,
    ApiResource,
    ApiScope,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceSettings {
    pub name: String,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub kind: ResourceKind,
    pub enabled: bool,
    pub required: bool,
    pub emphasize: bool,
    pub show_in_discovery_document: bool,
    pub scopes: Vec<String>,
    pub user_claims: Vec<String>,
    pub properties: BTreeMap<String, String>,
}

impl Default for ResourceSettings {
    fn default() -> Self {
        Self {
            name: String::new(),
            display_name: None,
            description: None,
            kind: ResourceKind::default(),
            enabled: true,
            required: false,
            emphasize: false,
            show_in_discovery_document: true,
            scopes: Vec::new(),
            user_claims: Vec::new(),
            properties: BTreeMap::new(),
        }
    }
}

impl ResourceSettings {
    pub fn validate(&self) -> Validation {
        let mut v = Validation::new();

        if self.name.trim().is_empty() {
            v.fail("Resource name is required");
        } else if self.name.chars().any(char::is_whitespace) {
            v.fail("Resource name must not contain whitespace");
        }

        if self.kind == ResourceKind::ApiResource {
            v.ensure(
                !self.scopes.is_empty(),
                "An API resource requires at least one scope",
            );
        }

        v.ensure(
            self.scopes.iter().all(|s| !s.trim().is_empty()),
            "Scope names must not be blank",
        );
        v.ensure(
            self.user_claims.iter().all(|c| !c.trim().is_empty()),
            "User claim types must not be blank",
        );

        v
    }
}

/// A stored resource definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourcesStore {
    pub id: EntityId,
    #[serde(flatten)]
    pub settings: ResourceSettings,
}

impl Entity for ResourcesStore {
    const ENTITY_TYPE: &'static str = "ResourcesStore";

    fn id(&self) -> EntityId {
        self.id
    }
}

#[derive(Debug, Clone)]
pub struct CreateResourcesStoreCommand {
    pub settings: ResourceSettings,
}

impl Command for CreateResourcesStoreCommand {
    const NAME: &'static str = "CreateResourcesStoreCommand";

    fn validate(&self) -> Validation {
        self.settings.validate()
    }
}

impl CreateCommand for CreateResourcesStoreCommand {
    type Entity = ResourcesStore;

    fn into_entity(self, id: EntityId) -> ResourcesStore {
        ResourcesStore {
            id,
            settings: self.settings,
        }
    }
}

#[derive(Debug, Clone)]
pub struct UpdateResourcesStoreCommand {
    pub id: EntityId,
    pub settings: ResourceSettings,
}

impl Command for UpdateResourcesStoreCommand {
    const NAME: &'static str = "UpdateResourcesStoreCommand";

    fn target_id(&self) -> Option<EntityId> {
        Some(self.id)
    }

    fn validate(&self) -> Validation {
        self.settings.validate()
    }
}

impl UpdateCommand for UpdateResourcesStoreCommand {
    type Entity = ResourcesStore;

    fn apply_to(self, existing: ResourcesStore) -> ResourcesStore {
        ResourcesStore {
            id: existing.id,
            settings: self.settings,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RemoveResourcesStoreCommand {
    pub id: EntityId,
}

impl Command for RemoveResourcesStoreCommand {
    const NAME: &'static str = "RemoveResourcesStoreCommand";

    fn target_id(&self) -> Option<EntityId> {
        Some(self.id)
    }
}

impl RemoveCommand for RemoveResourcesStoreCommand {
    type Entity = ResourcesStore;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_resource_requires_a_scope() {
        let settings = ResourceSettings {
            name: "orders".into(),
            kind: ResourceKind::ApiResource,
            ..ResourceSettings::default()
        };
        let v = settings.validate();
        assert_eq!(
            v.failures()[0].message,
            "An API resource requires at least one scope"
        );

        let with_scope = ResourceSettings {
            scopes: vec!["orders.read".into()],
            ..settings
        };
        assert!(with_scope.validate().is_valid());
    }

    #[test]
    fn identity_resource_needs_only_a_name() {
        let settings = ResourceSettings {
            name: "profile".into(),
            user_claims: vec!["name".into(), "website".into()],
            ..ResourceSettings::default()
        };
        assert!(settings.validate().is_valid());
    }

    #[test]
    fn name_must_be_present_and_unspaced() {
        assert!(!ResourceSettings::default().validate().is_valid());

        let spaced = ResourceSettings {
            name: "my api".into(),
            ..ResourceSettings::default()
        };
        assert!(!spaced.validate().is_valid());
    }

    #[test]
    fn kind_serializes_in_snake_case() {
        let json = serde_json::to_value(ResourceKind::ApiScope).unwrap();
        assert_eq!(json, "api_scope");
    }
}
