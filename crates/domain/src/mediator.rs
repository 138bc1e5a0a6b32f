//! In-process bus routing commands and events to their handlers.
//!
//! Routing is keyed on the concrete Rust type of the command or event and
//! fixed when the `Mediator` is built; `send` and `publish` only do a map
//! lookup.

use std::any::{Any, TypeId, type_name};
use std::collections::{HashMap, HashSet};
use std::marker::PhantomData;

use async_trait::async_trait;

use crate::command::{Command, CommandOutcome};
use crate::context::{PublishFailure, RequestContext};
use crate::error::{DomainError, EventHandlerError};
use crate::event::DomainEvent;
use crate::notification::{DomainNotification, NotificationCollector};

/// Handles one command type.
///
/// Recoverable failures are reported through `Mediator::notify` and a
/// `Rejected` outcome, never as errors.
#[async_trait]
pub trait CommandHandler<C: Command>: Send + Sync {
    async fn handle(
        &self,
        mediator: &Mediator,
        ctx: &mut RequestContext,
        command: C,
    ) -> CommandOutcome;
}

/// Reacts to one event type. Any number of handlers may exist per type.
#[async_trait]
pub trait EventHandler<V: DomainEvent>: Send + Sync {
    /// Handler name used when reporting failures.
    fn name(&self) -> &'static str {
        type_name::<Self>()
    }

    async fn handle(&self, ctx: &RequestContext, event: &V) -> Result<(), EventHandlerError>;
}

#[async_trait]
trait ErasedCommandHandler: Send + Sync {
    async fn handle_erased(
        &self,
        mediator: &Mediator,
        ctx: &mut RequestContext,
        command: Box<dyn Any + Send>,
    ) -> Result<CommandOutcome, DomainError>;
}

struct CommandSlot<C, H> {
    handler: H,
    _command: PhantomData<fn(C)>,
}

#[async_trait]
impl<C, H> ErasedCommandHandler for CommandSlot<C, H>
where
    C: Command,
    H: CommandHandler<C>,
{
    async fn handle_erased(
        &self,
        mediator: &Mediator,
        ctx: &mut RequestContext,
        command: Box<dyn Any + Send>,
    ) -> Result<CommandOutcome, DomainError> {
        let command = command
            .downcast::<C>()
            .map_err(|_| DomainError::HandlerTypeMismatch { expected: C::NAME })?;
        Ok(self.handler.handle(mediator, ctx, *command).await)
    }
}

#[async_trait]
trait ErasedEventHandler: Send + Sync {
    fn name(&self) -> &'static str;

    async fn handle_erased(
        &self,
        ctx: &RequestContext,
        event: &(dyn Any + Send + Sync),
    ) -> Result<(), EventHandlerError>;
}

struct EventSlot<V, H> {
    handler: H,
    _event: PhantomData<fn(&V)>,
}

#[async_trait]
impl<V, H> ErasedEventHandler for EventSlot<V, H>
where
    V: DomainEvent,
    H: EventHandler<V>,
{
    fn name(&self) -> &'static str {
        self.handler.name()
    }

    async fn handle_erased(
        &self,
        ctx: &RequestContext,
        event: &(dyn Any + Send + Sync),
    ) -> Result<(), EventHandlerError> {
        let event = event
            .downcast_ref::<V>()
            .ok_or(EventHandlerError::TypeMismatch(type_name::<V>()))?;
        self.handler.handle(ctx, event).await
    }
}

/// Collects handler registrations and validates them into a `Mediator`.
#[derive(Default)]
pub struct MediatorBuilder {
    command_handlers: Vec<(TypeId, &'static str, Box<dyn ErasedCommandHandler>)>,
    event_handlers: Vec<(TypeId, Box<dyn ErasedEventHandler>)>,
    required_commands: Vec<(TypeId, &'static str)>,
    required_events: Vec<(TypeId, &'static str)>,
}

impl MediatorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the handler for command type `C`. At most one is allowed.
    pub fn command_handler<C, H>(mut self, handler: H) -> Self
    where
        C: Command,
        H: CommandHandler<C> + 'static,
    {
        let slot = CommandSlot {
            handler,
            _command: PhantomData,
        };
        self.command_handlers
            .push((TypeId::of::<C>(), C::NAME, Box::new(slot)));
        self
    }

    /// Adds a handler for event type `V`. Handlers run in registration order.
    pub fn event_handler<V, H>(mut self, handler: H) -> Self
    where
        V: DomainEvent,
        H: EventHandler<V> + 'static,
    {
        let slot = EventSlot {
            handler,
            _event: PhantomData,
        };
        self.event_handlers.push((TypeId::of::<V>(), Box::new(slot)));
        self
    }

    /// Makes `build` fail unless a handler for `C` is registered.
    pub fn require_command<C: Command>(mut self) -> Self {
        self.required_commands.push((TypeId::of::<C>(), C::NAME));
        self
    }

    /// Makes `build` fail unless at least one handler for `V` is registered.
    pub fn require_event<V: DomainEvent>(mut self) -> Self {
        self.required_events
            .push((TypeId::of::<V>(), type_name::<V>()));
        self
    }

    /// Validates the registrations and freezes the routing table.
    pub fn build(self) -> Result<Mediator, DomainError> {
        let mut command_handlers: HashMap<TypeId, Box<dyn ErasedCommandHandler>> = HashMap::new();
        for (type_id, name, handler) in self.command_handlers {
            if command_handlers.insert(type_id, handler).is_some() {
                return Err(DomainError::MultipleHandlersRegistered { type_name: name });
            }
        }

        let mut event_handlers: HashMap<TypeId, Vec<Box<dyn ErasedEventHandler>>> = HashMap::new();
        for (type_id, handler) in self.event_handlers {
            event_handlers.entry(type_id).or_default().push(handler);
        }

        for (type_id, name) in self.required_commands {
            if !command_handlers.contains_key(&type_id) {
                return Err(DomainError::NoHandlerRegistered {
                    kind: "command",
                    type_name: name,
                });
            }
        }

        let mut seen = HashSet::new();
        for (type_id, name) in self.required_events {
            if seen.insert(type_id) && !event_handlers.contains_key(&type_id) {
                return Err(DomainError::NoHandlerRegistered {
                    kind: "event",
                    type_name: name,
                });
            }
        }

        tracing::debug!(
            commands = command_handlers.len(),
            event_types = event_handlers.len(),
            "mediator built"
        );

        Ok(Mediator {
            command_handlers,
            event_handlers,
        })
    }
}

/// The command/event bus.
///
/// Holds no per-request state: everything request-scoped travels in the
/// `RequestContext` passed to each call, so one `Mediator` serves all
/// requests concurrently.
pub struct Mediator {
    command_handlers: HashMap<TypeId, Box<dyn ErasedCommandHandler>>,
    event_handlers: HashMap<TypeId, Vec<Box<dyn ErasedEventHandler>>>,
}

impl Mediator {
    pub fn builder() -> MediatorBuilder {
        MediatorBuilder::new()
    }

    /// Routes `command` to its handler.
    ///
    /// Returns `Err` only for wiring errors. Whether the command succeeded is
    /// told by the outcome and, equivalently, by the context's notifications.
    #[tracing::instrument(skip(self, ctx, command), fields(command = C::NAME, request_id = %ctx.request_id()))]
    pub async fn send<C: Command>(
        &self,
        ctx: &mut RequestContext,
        command: C,
    ) -> Result<CommandOutcome, DomainError> {
        let handler = self
            .command_handlers
            .get(&TypeId::of::<C>())
            .ok_or(DomainError::NoHandlerRegistered {
                kind: "command",
                type_name: C::NAME,
            })?;

        let outcome = handler.handle_erased(self, ctx, Box::new(command)).await?;

        metrics::counter!(
            "mediator_commands_total",
            "command" => C::NAME,
            "outcome" => outcome.label()
        )
        .increment(1);

        Ok(outcome)
    }

    /// Delivers `event` to every handler registered for its type.
    ///
    /// A failing handler never aborts the publish or reaches the caller: the
    /// failure is logged and recorded as a `PublishFailure` on the context.
    #[tracing::instrument(skip_all, fields(event_type = tracing::field::Empty))]
    pub async fn publish<V: DomainEvent>(&self, ctx: &mut RequestContext, event: &V) {
        let event_type = event.event_type();
        tracing::Span::current().record("event_type", event_type.as_str());

        let handlers = self
            .event_handlers
            .get(&TypeId::of::<V>())
            .map(Vec::as_slice)
            .unwrap_or_default();

        metrics::counter!("mediator_events_published_total", "event" => event_type.clone())
            .increment(1);

        for handler in handlers {
            let result = handler.handle_erased(ctx, event).await;
            if let Err(e) = result {
                tracing::error!(
                    handler = handler.name(),
                    event_type = %event_type,
                    entity_id = %event.entity_id(),
                    error = %e,
                    "event handler failed; the committed write stands"
                );
                metrics::counter!(
                    "mediator_event_handler_failures_total",
                    "event" => event_type.clone()
                )
                .increment(1);
                ctx.record_publish_failure(PublishFailure {
                    event_type: event_type.clone(),
                    handler: handler.name(),
                    reason: e.to_string(),
                });
            }
        }
    }

    /// Adds a notification to the request's collector.
    pub fn notify(&self, ctx: &mut RequestContext, notification: DomainNotification) {
        tracing::debug!(
            request_id = %ctx.request_id(),
            code = %notification.code,
            message = %notification.message,
            "domain notification"
        );
        ctx.notify(notification);
    }

    /// The collector bound to `ctx`, read by the HTTP layer after `send`.
    pub fn notification_handler<'a>(&self, ctx: &'a RequestContext) -> &'a NotificationCollector {
        ctx.notifications()
    }

    pub fn has_command_handler<C: Command>(&self) -> bool {
        self.command_handlers.contains_key(&TypeId::of::<C>())
    }

    pub fn event_handler_count<V: DomainEvent>(&self) -> usize {
        self.event_handlers
            .get(&TypeId::of::<V>())
            .map_or(0, Vec::len)
    }
}

impl std::fmt::Debug for Mediator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mediator")
            .field("command_handlers", &self.command_handlers.len())
            .field("event_types", &self.event_handlers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use common::{ActingPrincipal, EntityId};
    use serde::{Deserialize, Serialize};

    use super::*;
    use crate::entity::Entity;
    use crate::event::EntityCreated;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Note {
        id: EntityId,
    }

    impl Entity for Note {
        const ENTITY_TYPE: &'static str = "Note";

        fn id(&self) -> EntityId {
            self.id
        }
    }

    struct Ping;

    impl Command for Ping {
        const NAME: &'static str = "Ping";
    }

    struct Pong;

    impl Command for Pong {
        const NAME: &'static str = "Pong";
    }

    struct PingHandler;

    #[async_trait]
    impl CommandHandler<Ping> for PingHandler {
        async fn handle(
            &self,
            mediator: &Mediator,
            ctx: &mut RequestContext,
            _command: Ping,
        ) -> CommandOutcome {
            let note = Note { id: EntityId::new() };
            mediator.publish(ctx, &EntityCreated::new(note.clone())).await;
            CommandOutcome::Completed { entity_id: note.id }
        }
    }

    #[derive(Clone, Default)]
    struct Counting(Arc<AtomicUsize>);

    #[async_trait]
    impl EventHandler<EntityCreated<Note>> for Counting {
        async fn handle(
            &self,
            _ctx: &RequestContext,
            _event: &EntityCreated<Note>,
        ) -> Result<(), EventHandlerError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct Broken;

    #[async_trait]
    impl EventHandler<EntityCreated<Note>> for Broken {
        fn name(&self) -> &'static str {
            "broken"
        }

        async fn handle(
            &self,
            _ctx: &RequestContext,
            _event: &EntityCreated<Note>,
        ) -> Result<(), EventHandlerError> {
            Err(EventHandlerError::Aborted("boom".to_string()))
        }
    }

    fn ctx() -> RequestContext {
        RequestContext::new(ActingPrincipal::anonymous())
    }

    #[tokio::test]
    async fn send_routes_to_registered_handler() {
        let counter = Counting::default();
        let mediator = Mediator::builder()
            .command_handler::<Ping, _>(PingHandler)
            .event_handler::<EntityCreated<Note>, _>(counter.clone())
            .build()
            .unwrap();

        let mut ctx = ctx();
        let outcome = mediator.send(&mut ctx, Ping).await.unwrap();

        assert!(outcome.is_completed());
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn send_without_handler_is_a_wiring_error() {
        let mediator = Mediator::builder().build().unwrap();
        let result = mediator.send(&mut ctx(), Pong).await;
        assert!(matches!(
            result,
            Err(DomainError::NoHandlerRegistered { type_name: "Pong", .. })
        ));
    }

    #[test]
    fn duplicate_command_handlers_fail_the_build() {
        let result = Mediator::builder()
            .command_handler::<Ping, _>(PingHandler)
            .command_handler::<Ping, _>(PingHandler)
            .build();
        assert!(matches!(
            result,
            Err(DomainError::MultipleHandlersRegistered { type_name: "Ping" })
        ));
    }

    #[test]
    fn required_command_without_handler_fails_the_build() {
        let result = Mediator::builder()
            .command_handler::<Ping, _>(PingHandler)
            .require_command::<Pong>()
            .build();
        assert!(matches!(
            result,
            Err(DomainError::NoHandlerRegistered { kind: "command", .. })
        ));
    }

    #[test]
    fn required_event_without_handler_fails_the_build() {
        let result = Mediator::builder()
            .require_event::<EntityCreated<Note>>()
            .build();
        assert!(matches!(
            result,
            Err(DomainError::NoHandlerRegistered { kind: "event", .. })
        ));
    }

    #[tokio::test]
    async fn publish_reaches_every_handler_despite_failures() {
        let counter = Counting::default();
        let mediator = Mediator::builder()
            .event_handler::<EntityCreated<Note>, _>(Broken)
            .event_handler::<EntityCreated<Note>, _>(counter.clone())
            .build()
            .unwrap();
        assert_eq!(mediator.event_handler_count::<EntityCreated<Note>>(), 2);

        let mut ctx = ctx();
        let event = EntityCreated::new(Note { id: EntityId::new() });
        mediator.publish(&mut ctx, &event).await;

        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
        assert_eq!(ctx.publish_failures().len(), 1);
        assert_eq!(ctx.publish_failures()[0].handler, "broken");
        assert!(!ctx.notifications().has_notifications());
    }

    #[tokio::test]
    async fn publish_without_handlers_is_a_no_op() {
        let mediator = Mediator::builder().build().unwrap();
        let mut ctx = ctx();
        mediator
            .publish(&mut ctx, &EntityCreated::new(Note { id: EntityId::new() }))
            .await;
        assert!(ctx.publish_failures().is_empty());
    }

    #[test]
    fn notify_lands_in_the_context_collector() {
        let mediator = Mediator::builder().build().unwrap();
        let mut ctx = ctx();

        mediator.notify(&mut ctx, DomainNotification::validation("bad"));

        let collector = mediator.notification_handler(&ctx);
        assert!(collector.has_notifications());
        assert_eq!(collector.get_notifications()[0].message, "bad");
    }
}
