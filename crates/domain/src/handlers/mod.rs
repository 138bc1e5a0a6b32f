//! Generic handlers shared by every entity type.
//!
//! The command handlers validate, write through a `Repository` and publish
//! the matching event. `StoreEventHandler` appends published events to the
//! event store.

mod command;
mod event;

pub use command::{CreateHandler, RemoveHandler, UpdateHandler};
pub use event::StoreEventHandler;
