//! Identity configuration entities and their wiring onto the mediator.

pub mod client;
pub mod persisted_grant;
pub mod resources;

use std::sync::Arc;

use event_store::EventStore;

use crate::command::{CreateCommand, RemoveCommand, UpdateCommand};
use crate::event::{EntityCreated, EntityRemoved, EntityUpdated};
use crate::handlers::{CreateHandler, RemoveHandler, StoreEventHandler, UpdateHandler};
use crate::mediator::MediatorBuilder;
use crate::repository::{InMemoryRepository, Repository};

pub use client::{
    ClientSettings, ClientStore, CreateClientStoreCommand, RemoveClientStoreCommand,
    UpdateClientStoreCommand,
};
pub use persisted_grant::{
    CreatePersistedGrantStoreCommand, NewPersistedGrant, PersistedGrantChanges,
    PersistedGrantStore, RemovePersistedGrantStoreCommand, UpdatePersistedGrantStoreCommand,
};
pub use resources::{
    CreateResourcesStoreCommand, RemoveResourcesStoreCommand, ResourceKind, ResourceSettings,
    ResourcesStore, UpdateResourcesStoreCommand,
};

pub type CreatedClientStoreEvent = EntityCreated<ClientStore>;
pub type UpdatedClientStoreEvent = EntityUpdated<ClientStore>;
pub type RemovedClientStoreEvent = EntityRemoved<ClientStore>;

pub type CreatedResourcesStoreEvent = EntityCreated<ResourcesStore>;
pub type UpdatedResourcesStoreEvent = EntityUpdated<ResourcesStore>;
pub type RemovedResourcesStoreEvent = EntityRemoved<ResourcesStore>;

pub type CreatedPersistedGrantStoreEvent = EntityCreated<PersistedGrantStore>;
pub type UpdatedPersistedGrantStoreEvent = EntityUpdated<PersistedGrantStore>;
pub type RemovedPersistedGrantStoreEvent = EntityRemoved<PersistedGrantStore>;

/// The repositories backing the identity entities.
#[derive(Clone)]
pub struct IdentityRepositories {
    pub clients: Arc<dyn Repository<ClientStore>>,
    pub resources: Arc<dyn Repository<ResourcesStore>>,
    pub persisted_grants: Arc<dyn Repository<PersistedGrantStore>>,
}

impl IdentityRepositories {
    /// In-memory repositories enforcing unique client ids, resource names
    /// and grant keys.
    pub fn in_memory() -> Self {
        Self {
            clients: Arc::new(
                InMemoryRepository::new()
                    .with_unique_key("client_id", |c: &ClientStore| c.settings.client_id.clone()),
            ),
            resources: Arc::new(
                InMemoryRepository::new()
                    .with_unique_key("name", |r: &ResourcesStore| r.settings.name.clone()),
            ),
            persisted_grants: Arc::new(
                InMemoryRepository::new()
                    .with_unique_key("key", |g: &PersistedGrantStore| g.key.clone()),
            ),
        }
    }
}

/// Registers the command handlers of one entity and the event-store
/// handlers of its three events, and marks all of them required.
fn register_entity<Create, Update, Remove>(
    builder: MediatorBuilder,
    repository: &Arc<dyn Repository<Create::Entity>>,
    store: &Arc<dyn EventStore>,
) -> MediatorBuilder
where
    Create: CreateCommand,
    Update: UpdateCommand<Entity = Create::Entity>,
    Remove: RemoveCommand<Entity = Create::Entity>,
{
    builder
        .command_handler::<Create, _>(CreateHandler::<Create>::new(Arc::clone(repository)))
        .command_handler::<Update, _>(UpdateHandler::<Update>::new(Arc::clone(repository)))
        .command_handler::<Remove, _>(RemoveHandler::<Remove>::new(Arc::clone(repository)))
        .event_handler::<EntityCreated<Create::Entity>, _>(StoreEventHandler::<
            EntityCreated<Create::Entity>,
        >::new(Arc::clone(store)))
        .event_handler::<EntityUpdated<Create::Entity>, _>(StoreEventHandler::<
            EntityUpdated<Create::Entity>,
        >::new(Arc::clone(store)))
        .event_handler::<EntityRemoved<Create::Entity>, _>(StoreEventHandler::<
            EntityRemoved<Create::Entity>,
        >::new(Arc::clone(store)))
        .require_command::<Create>()
        .require_command::<Update>()
        .require_command::<Remove>()
        .require_event::<EntityCreated<Create::Entity>>()
        .require_event::<EntityUpdated<Create::Entity>>()
        .require_event::<EntityRemoved<Create::Entity>>()
}

/// Wires clients, resources and persisted grants onto `builder`.
pub fn register(
    builder: MediatorBuilder,
    repositories: &IdentityRepositories,
    store: Arc<dyn EventStore>,
) -> MediatorBuilder {
    let builder = register_entity::<
        CreateClientStoreCommand,
        UpdateClientStoreCommand,
        RemoveClientStoreCommand,
    >(builder, &repositories.clients, &store);

    let builder = register_entity::<
        CreateResourcesStoreCommand,
        UpdateResourcesStoreCommand,
        RemoveResourcesStoreCommand,
    >(builder, &repositories.resources, &store);

    register_entity::<
        CreatePersistedGrantStoreCommand,
        UpdatePersistedGrantStoreCommand,
        RemovePersistedGrantStoreCommand,
    >(builder, &repositories.persisted_grants, &store)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use event_store::InMemoryEventStore;

    use super::*;
    use crate::command::CommandOutcome;
    use crate::context::RequestContext;
    use crate::event::DomainEvent;
    use crate::mediator::Mediator;

    #[test]
    fn register_wires_every_identity_command_and_event() {
        let store: Arc<dyn EventStore> = Arc::new(InMemoryEventStore::new());
        let mediator = register(Mediator::builder(), &IdentityRepositories::in_memory(), store)
            .build()
            .unwrap();

        assert!(mediator.has_command_handler::<CreateClientStoreCommand>());
        assert!(mediator.has_command_handler::<UpdateResourcesStoreCommand>());
        assert!(mediator.has_command_handler::<RemovePersistedGrantStoreCommand>());
        assert_eq!(mediator.event_handler_count::<RemovedResourcesStoreEvent>(), 1);
        assert_eq!(mediator.event_handler_count::<CreatedPersistedGrantStoreEvent>(), 1);
    }

    #[test]
    fn registering_twice_is_a_configuration_error() {
        let store: Arc<dyn EventStore> = Arc::new(InMemoryEventStore::new());
        let repositories = IdentityRepositories::in_memory();
        let builder = register(Mediator::builder(), &repositories, Arc::clone(&store));
        assert!(register(builder, &repositories, store).build().is_err());
    }

    #[test]
    fn event_aliases_carry_identity_names() {
        let removed = RemovedResourcesStoreEvent::new(common::EntityId::new(), None);
        assert_eq!(removed.event_type(), "RemovedResourcesStoreEvent");
    }

    #[tokio::test]
    async fn grant_update_may_not_expire_before_creation() {
        let store = InMemoryEventStore::new();
        let shared: Arc<dyn EventStore> = Arc::new(store.clone());
        let repositories = IdentityRepositories::in_memory();
        let mediator = register(Mediator::builder(), &repositories, shared)
            .build()
            .unwrap();
        let mut ctx = RequestContext::new(common::ActingPrincipal::anonymous());
        let now = Utc::now();

        let id = mediator
            .send(
                &mut ctx,
                CreatePersistedGrantStoreCommand {
                    grant: NewPersistedGrant {
                        key: "grant-key".into(),
                        grant_type: "refresh_token".into(),
                        subject_id: None,
                        session_id: None,
                        client_id: "backend".into(),
                        description: None,
                        creation_time: now,
                        expiration: Some(now + Duration::days(1)),
                        consumed_time: None,
                        data: "{}".into(),
                        is_active: true,
                    },
                },
            )
            .await
            .unwrap()
            .entity_id()
            .unwrap();

        let outcome = mediator
            .send(
                &mut ctx,
                UpdatePersistedGrantStoreCommand {
                    id,
                    changes: PersistedGrantChanges {
                        expiration: Some(now - Duration::days(30)),
                        ..PersistedGrantChanges::default()
                    },
                },
            )
            .await
            .unwrap();

        assert_eq!(outcome, CommandOutcome::Rejected);
        assert!(ctx.notifications().has_notifications());
        let stored = repositories.persisted_grants.get(id).await.unwrap().unwrap();
        assert_eq!(stored.expiration, Some(now + Duration::days(1)));
        assert_eq!(store.record_count().await, 1);
    }
}
