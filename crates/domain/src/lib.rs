//! Command/event mediation core for the identity write API.
//!
//! This crate provides:
//! - `Mediator`, an in-process bus routing commands and events by concrete type
//! - request-scoped `DomainNotification` collection through `RequestContext`
//! - generic Create/Update/Remove command handlers over any `Entity`
//! - a generic event handler appending every published event to the event store
//! - the identity entities (clients, resources, persisted grants) wired onto it

pub mod command;
pub mod context;
pub mod entity;
pub mod error;
pub mod event;
pub mod handlers;
pub mod identity;
pub mod mediator;
pub mod notification;
pub mod repository;

pub use command::{Command, CommandOutcome, CreateCommand, RemoveCommand, UpdateCommand, Validation};
pub use common::{ActingPrincipal, EntityId, PrincipalId};
pub use context::{PublishFailure, RequestContext};
pub use entity::Entity;
pub use error::{DomainError, EventHandlerError};
pub use event::{DomainEvent, EntityCreated, EntityRemoved, EntityUpdated, EventKind};
pub use handlers::{CreateHandler, RemoveHandler, StoreEventHandler, UpdateHandler};
pub use mediator::{CommandHandler, EventHandler, Mediator, MediatorBuilder};
pub use notification::{DomainNotification, NotificationCollector};
pub use repository::{InMemoryRepository, Repository, RepositoryError};
