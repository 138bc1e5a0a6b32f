//! Repository port used by the generic command handlers.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::EntityId;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::entity::Entity;
use crate::notification::{DomainNotification, codes};

/// Typed failure of a repository write.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    /// The target entity does not exist.
    #[error("{entity_type} {id} not found")]
    NotFound {
        entity_type: &'static str,
        id: EntityId,
    },

    /// The write collides with stored state (duplicate key, concurrent change).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The storage backend could not be reached.
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),
}

impl RepositoryError {
    pub fn code(&self) -> &'static str {
        match self {
            RepositoryError::NotFound { .. } => codes::NOT_FOUND,
            RepositoryError::Conflict(_) => codes::CONFLICT,
            RepositoryError::StorageUnavailable(_) => codes::STORAGE_UNAVAILABLE,
        }
    }
}

impl From<&RepositoryError> for DomainNotification {
    fn from(err: &RepositoryError) -> Self {
        DomainNotification::new(err.code(), err.to_string())
    }
}

/// CRUD storage for one entity type.
///
/// Shared by all requests; implementations handle their own concurrency.
#[async_trait]
pub trait Repository<E: Entity>: Send + Sync {
    async fn get(&self, id: EntityId) -> Result<Option<E>, RepositoryError>;

    async fn insert(&self, entity: E) -> Result<(), RepositoryError>;

    async fn update(&self, entity: E) -> Result<(), RepositoryError>;

    /// Removes the entity and returns its state at the moment of removal.
    async fn remove(&self, id: EntityId) -> Result<E, RepositoryError>;
}

/// Extracts a natural key that must be unique across stored entities.
pub type UniqueKey<E> = fn(&E) -> String;

/// In-memory repository, optionally enforcing a unique natural key.
#[derive(Clone)]
pub struct InMemoryRepository<E: Entity> {
    entities: Arc<RwLock<HashMap<EntityId, E>>>,
    unique_key: Option<(&'static str, UniqueKey<E>)>,
}

impl<E: Entity> Default for InMemoryRepository<E> {
    fn default() -> Self {
        Self {
            entities: Arc::new(RwLock::new(HashMap::new())),
            unique_key: None,
        }
    }
}

impl<E: Entity> InMemoryRepository<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects inserts and updates that would duplicate `key` with `Conflict`.
    pub fn with_unique_key(mut self, key_name: &'static str, key: UniqueKey<E>) -> Self {
        self.unique_key = Some((key_name, key));
        self
    }

    pub async fn len(&self) -> usize {
        self.entities.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entities.read().await.is_empty()
    }

    fn check_unique(&self, entities: &HashMap<EntityId, E>, entity: &E) -> Result<(), RepositoryError> {
        let Some((key_name, key)) = self.unique_key else {
            return Ok(());
        };
        let wanted = key(entity);
        let taken = entities
            .values()
            .any(|other| other.id() != entity.id() && key(other) == wanted);
        if taken {
            return Err(RepositoryError::Conflict(format!(
                "{} with {key_name} '{wanted}' already exists",
                E::ENTITY_TYPE
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl<E: Entity> Repository<E> for InMemoryRepository<E> {
    async fn get(&self, id: EntityId) -> Result<Option<E>, RepositoryError> {
        Ok(self.entities.read().await.get(&id).cloned())
    }

    async fn insert(&self, entity: E) -> Result<(), RepositoryError> {
        let mut entities = self.entities.write().await;
        if entities.contains_key(&entity.id()) {
            return Err(RepositoryError::Conflict(format!(
                "{} {} already exists",
                E::ENTITY_TYPE,
                entity.id()
            )));
        }
        self.check_unique(&entities, &entity)?;
        entities.insert(entity.id(), entity);
        Ok(())
    }

    async fn update(&self, entity: E) -> Result<(), RepositoryError> {
        let mut entities = self.entities.write().await;
        if !entities.contains_key(&entity.id()) {
            return Err(RepositoryError::NotFound {
                entity_type: E::ENTITY_TYPE,
                id: entity.id(),
            });
        }
        self.check_unique(&entities, &entity)?;
        entities.insert(entity.id(), entity);
        Ok(())
    }

    async fn remove(&self, id: EntityId) -> Result<E, RepositoryError> {
        self.entities
            .write()
            .await
            .remove(&id)
            .ok_or(RepositoryError::NotFound {
                entity_type: E::ENTITY_TYPE,
                id,
            })
    }
}
