//! Command traits and validation.

use common::EntityId;

use crate::entity::Entity;
use crate::notification::{DomainNotification, codes};

/// Outcome of sending a command.
///
/// `Rejected` always comes with at least one notification in the request
/// context; `Completed` with none from the handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// The write succeeded and its event was published.
    Completed { entity_id: EntityId },

    /// Nothing was written and nothing was published.
    Rejected,
}

impl CommandOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, CommandOutcome::Completed { .. })
    }

    pub fn entity_id(&self) -> Option<EntityId> {
        match self {
            CommandOutcome::Completed { entity_id } => Some(*entity_id),
            CommandOutcome::Rejected => None,
        }
    }

    pub(crate) fn label(&self) -> &'static str {
        match self {
            CommandOutcome::Completed { .. } => "completed",
            CommandOutcome::Rejected => "rejected",
        }
    }
}

/// Result of structurally validating a command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Validation {
    failures: Vec<DomainNotification>,
}

impl Validation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a failure with the generic validation code.
    pub fn fail(&mut self, message: impl Into<String>) -> &mut Self {
        self.failures.push(DomainNotification::validation(message));
        self
    }

    /// Records a failure with a specific code.
    pub fn fail_with(&mut self, code: impl Into<String>, message: impl Into<String>) -> &mut Self {
        self.failures.push(DomainNotification::new(code, message));
        self
    }

    /// Records `message` unless `condition` holds.
    pub fn ensure(&mut self, condition: bool, message: impl Into<String>) -> &mut Self {
        if !condition {
            self.fail(message);
        }
        self
    }

    pub fn is_valid(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failures(&self) -> &[DomainNotification] {
        &self.failures
    }

    pub fn into_notifications(self) -> Vec<DomainNotification> {
        self.failures
    }
}

/// An intent to mutate one entity instance.
///
/// Commands are moved into the mediator and never mutated by it: failed
/// validation is reported through notifications.
pub trait Command: Send + Sync + 'static {
    /// Stable command name for logs and metrics.
    const NAME: &'static str;

    /// The entity the command targets; `None` for creation.
    fn target_id(&self) -> Option<EntityId> {
        None
    }

    /// Structural validation, run before any repository access.
    fn validate(&self) -> Validation {
        Validation::new()
    }

    fn is_valid(&self) -> bool {
        self.validate().is_valid()
    }
}

/// A command creating a new entity.
pub trait CreateCommand: Command {
    type Entity: Entity;

    /// Maps the payload onto a new entity carrying the generated `id`.
    fn into_entity(self, id: EntityId) -> Self::Entity;
}

/// A command changing an existing entity.
pub trait UpdateCommand: Command {
    type Entity: Entity;

    /// Maps the payload onto the stored entity. Whether this is a full or
    /// partial overwrite is up to the entity; the id must be kept.
    fn apply_to(self, existing: Self::Entity) -> Self::Entity;

    /// Checks the payload against the stored entity, for rules that span
    /// supplied and kept fields. Runs before `apply_to`.
    fn validate_against(&self, _existing: &Self::Entity) -> Validation {
        Validation::new()
    }
}

/// A command removing an existing entity.
pub trait RemoveCommand: Command {
    type Entity: Entity;
}

pub(crate) fn missing_target(command: &'static str) -> DomainNotification {
    DomainNotification::new(
        codes::VALIDATION,
        format!("{command} requires the identifier of the target entity"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_collects_failures_in_order() {
        let mut validation = Validation::new();
        validation
            .ensure(true, "never recorded")
            .ensure(false, "first")
            .fail_with("client.redirect_uris", "second");

        assert!(!validation.is_valid());
        let messages: Vec<_> = validation.failures().iter().map(|n| n.message.as_str()).collect();
        assert_eq!(messages, vec!["first", "second"]);
        assert_eq!(validation.failures()[1].code, "client.redirect_uris");
    }

    #[test]
    fn outcome_exposes_entity_id_only_when_completed() {
        let id = EntityId::new();
        assert_eq!(
            CommandOutcome::Completed { entity_id: id }.entity_id(),
            Some(id)
        );
        assert_eq!(CommandOutcome::Rejected.entity_id(), None);
        assert!(!CommandOutcome::Rejected.is_completed());
    }
}
