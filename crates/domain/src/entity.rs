//! The entity abstraction the generic handlers operate on.

use common::EntityId;
use serde::{Serialize, de::DeserializeOwned};

/// Anything with a stable identifier that a repository can insert, update
/// and remove.
pub trait Entity: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Entity type name, used in event names and audit records.
    const ENTITY_TYPE: &'static str;

    fn id(&self) -> EntityId;
}
