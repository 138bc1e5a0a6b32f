use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use common::EntityId;

use crate::command::{
    Command, CommandOutcome, CreateCommand, RemoveCommand, UpdateCommand, Validation,
    missing_target,
};
use crate::context::RequestContext;
use crate::entity::Entity;
use crate::event::{EntityCreated, EntityRemoved, EntityUpdated};
use crate::mediator::{CommandHandler, Mediator};
use crate::notification::DomainNotification;
use crate::repository::{Repository, RepositoryError};

/// Notifies every validation failure. Returns `true` if any.
fn reject_failures<C: Command>(
    mediator: &Mediator,
    ctx: &mut RequestContext,
    validation: Validation,
) -> bool {
    if validation.is_valid() {
        return false;
    }

    tracing::debug!(
        command = C::NAME,
        failures = validation.failures().len(),
        "command failed validation"
    );
    for notification in validation.into_notifications() {
        mediator.notify(ctx, notification);
    }
    true
}

fn reject_invalid<C: Command>(mediator: &Mediator, ctx: &mut RequestContext, command: &C) -> bool {
    reject_failures::<C>(mediator, ctx, command.validate())
}

fn reject_storage<C: Command>(mediator: &Mediator, ctx: &mut RequestContext, error: &RepositoryError) {
    match error {
        RepositoryError::NotFound { .. } => {
            tracing::debug!(command = C::NAME, error = %error, "command target not found");
        }
        _ => {
            tracing::warn!(command = C::NAME, code = error.code(), error = %error, "repository write failed");
        }
    }
    mediator.notify(ctx, DomainNotification::from(error));
}

/// Loads the target of an update or remove, notifying when it is missing.
async fn load_target<C, E>(
    repository: &dyn Repository<E>,
    mediator: &Mediator,
    ctx: &mut RequestContext,
    command: &C,
) -> Option<E>
where
    C: Command,
    E: Entity,
{
    let Some(id) = command.target_id() else {
        mediator.notify(ctx, missing_target(C::NAME));
        return None;
    };

    let lookup = match repository.get(id).await {
        Ok(Some(existing)) => return Some(existing),
        Ok(None) => RepositoryError::NotFound {
            entity_type: E::ENTITY_TYPE,
            id,
        },
        Err(e) => e,
    };
    reject_storage::<C>(mediator, ctx, &lookup);
    None
}

/// Creates an entity from a `CreateCommand` and publishes `EntityCreated`.
pub struct CreateHandler<C: CreateCommand> {
    repository: Arc<dyn Repository<C::Entity>>,
    _command: PhantomData<fn(C)>,
}

impl<C: CreateCommand> CreateHandler<C> {
    pub fn new(repository: Arc<dyn Repository<C::Entity>>) -> Self {
        Self {
            repository,
            _command: PhantomData,
        }
    }
}

#[async_trait]
impl<C: CreateCommand> CommandHandler<C> for CreateHandler<C> {
    async fn handle(
        &self,
        mediator: &Mediator,
        ctx: &mut RequestContext,
        command: C,
    ) -> CommandOutcome {
        if reject_invalid(mediator, ctx, &command) {
            return CommandOutcome::Rejected;
        }

        let entity = command.into_entity(EntityId::new());
        let entity_id = entity.id();

        if let Err(e) = self.repository.insert(entity.clone()).await {
            reject_storage::<C>(mediator, ctx, &e);
            return CommandOutcome::Rejected;
        }

        mediator.publish(ctx, &EntityCreated::new(entity)).await;
        CommandOutcome::Completed { entity_id }
    }
}

/// Applies an `UpdateCommand` to the stored entity and publishes `EntityUpdated`.
pub struct UpdateHandler<C: UpdateCommand> {
    repository: Arc<dyn Repository<C::Entity>>,
    _command: PhantomData<fn(C)>,
}

impl<C: UpdateCommand> UpdateHandler<C> {
    pub fn new(repository: Arc<dyn Repository<C::Entity>>) -> Self {
        Self {
            repository,
            _command: PhantomData,
        }
    }
}

#[async_trait]
impl<C: UpdateCommand> CommandHandler<C> for UpdateHandler<C> {
    async fn handle(
        &self,
        mediator: &Mediator,
        ctx: &mut RequestContext,
        command: C,
    ) -> CommandOutcome {
        if reject_invalid(mediator, ctx, &command) {
            return CommandOutcome::Rejected;
        }

        let Some(existing) = load_target(self.repository.as_ref(), mediator, ctx, &command).await
        else {
            return CommandOutcome::Rejected;
        };
        let entity_id = existing.id();

        if reject_failures::<C>(mediator, ctx, command.validate_against(&existing)) {
            return CommandOutcome::Rejected;
        }

        let updated = command.apply_to(existing.clone());
        if updated.id() != entity_id {
            mediator.notify(
                ctx,
                DomainNotification::validation(format!(
                    "{} may not change the identifier of {} {entity_id}",
                    C::NAME,
                    <C::Entity as Entity>::ENTITY_TYPE
                )),
            );
            return CommandOutcome::Rejected;
        }

        if let Err(e) = self.repository.update(updated.clone()).await {
            reject_storage::<C>(mediator, ctx, &e);
            return CommandOutcome::Rejected;
        }

        mediator
            .publish(ctx, &EntityUpdated::new(existing, updated))
            .await;
        CommandOutcome::Completed { entity_id }
    }
}

/// Removes the entity named by a `RemoveCommand` and publishes `EntityRemoved`
/// carrying the state the repository removed as tombstone.
pub struct RemoveHandler<C: RemoveCommand> {
    repository: Arc<dyn Repository<C::Entity>>,
    _command: PhantomData<fn(C)>,
}

impl<C: RemoveCommand> RemoveHandler<C> {
    pub fn new(repository: Arc<dyn Repository<C::Entity>>) -> Self {
        Self {
            repository,
            _command: PhantomData,
        }
    }
}

#[async_trait]
impl<C: RemoveCommand> CommandHandler<C> for RemoveHandler<C> {
    async fn handle(
        &self,
        mediator: &Mediator,
        ctx: &mut RequestContext,
        command: C,
    ) -> CommandOutcome {
        if reject_invalid(mediator, ctx, &command) {
            return CommandOutcome::Rejected;
        }

        let Some(existing) = load_target(self.repository.as_ref(), mediator, ctx, &command).await
        else {
            return CommandOutcome::Rejected;
        };
        let entity_id = existing.id();

        let removed = match self.repository.remove(entity_id).await {
            Ok(removed) => removed,
            Err(e) => {
                reject_storage::<C>(mediator, ctx, &e);
                return CommandOutcome::Rejected;
            }
        };

        mediator
            .publish(ctx, &EntityRemoved::<C::Entity>::new(entity_id, Some(removed)))
            .await;
        CommandOutcome::Completed { entity_id }
    }
}
