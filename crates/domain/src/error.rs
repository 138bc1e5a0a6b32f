//! Domain error types.

use event_store::EventStoreError;
use thiserror::Error;

/// Wiring errors of the mediator.
///
/// These are configuration failures: a correctly composed mediator never
/// returns them at request time. Recoverable failures while handling a
/// command are reported as notifications instead.
#[derive(Debug, Error)]
pub enum DomainError {
    /// No handler is registered for a command or a required event type.
    #[error("No handler registered for {kind} {type_name}")]
    NoHandlerRegistered {
        kind: &'static str,
        type_name: &'static str,
    },

    /// More than one handler was registered for a command type.
    #[error("Multiple handlers registered for command {type_name}")]
    MultipleHandlersRegistered { type_name: &'static str },

    /// The registry handed a handler a message of another type.
    #[error("Handler for {expected} received a message of a different type")]
    HandlerTypeMismatch { expected: &'static str },
}

/// Failure of a single event handler during publish.
#[derive(Debug, Error)]
pub enum EventHandlerError {
    /// The event could not be turned into a record.
    #[error("Event serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The event store rejected or failed the append.
    #[error("Event store error: {0}")]
    EventStore(#[from] EventStoreError),

    /// The append task panicked or was cancelled by the runtime.
    #[error("Event handler task aborted: {0}")]
    Aborted(String),

    /// The registry handed the handler an event of another type.
    #[error("Event handler for {0} received an event of a different type")]
    TypeMismatch(&'static str),
}
