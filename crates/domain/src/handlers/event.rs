use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use event_store::{EventStore, EventStoreRecord};

use crate::context::RequestContext;
use crate::entity::Entity;
use crate::error::EventHandlerError;
use crate::event::DomainEvent;
use crate::mediator::EventHandler;

/// Appends every event of type `V` to the event store, stamped with the
/// acting principal of the request that raised it.
pub struct StoreEventHandler<V> {
    store: Arc<dyn EventStore>,
    _event: PhantomData<fn(&V)>,
}

impl<V: DomainEvent> StoreEventHandler<V> {
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self {
            store,
            _event: PhantomData,
        }
    }

    fn to_record(&self, ctx: &RequestContext, event: &V) -> Result<EventStoreRecord, EventHandlerError> {
        let principal = ctx.principal();
        let record = EventStoreRecord::builder()
            .event_type(event.event_type())
            .event_kind(event.kind())
            .entity_id(event.entity_id())
            .entity_type(<V::Entity as Entity>::ENTITY_TYPE)
            .principal(principal.id, principal.name.clone())
            .metadata("request_id", serde_json::json!(ctx.request_id()))
            .payload(event)?
            .build()?;
        Ok(record)
    }
}

#[async_trait]
impl<V: DomainEvent> EventHandler<V> for StoreEventHandler<V> {
    fn name(&self) -> &'static str {
        "store_event_handler"
    }

    #[tracing::instrument(skip_all, fields(event_type = tracing::field::Empty, entity_id = %event.entity_id()))]
    async fn handle(&self, ctx: &RequestContext, event: &V) -> Result<(), EventHandlerError> {
        let record = self.to_record(ctx, event)?;
        tracing::Span::current().record("event_type", record.event_type.as_str());

        // The append runs on its own task so that dropping the request
        // future after the write does not drop the audit record with it.
        let store = Arc::clone(&self.store);
        let append = tokio::spawn(async move { store.append(record).await });

        append
            .await
            .map_err(|e| EventHandlerError::Aborted(e.to_string()))??;

        tracing::debug!("event appended to store");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use common::{ActingPrincipal, EntityId, PrincipalId};
    use event_store::{EventKind, EventStoreExt, InMemoryEventStore};
    use serde::{Deserialize, Serialize};

    use super::*;
    use crate::event::{EntityCreated, EntityRemoved};

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Key {
        id: EntityId,
        value: String,
    }

    impl Entity for Key {
        const ENTITY_TYPE: &'static str = "Key";

        fn id(&self) -> EntityId {
            self.id
        }
    }

    #[tokio::test]
    async fn appends_record_stamped_with_principal() {
        let store = InMemoryEventStore::new();
        let handler = StoreEventHandler::<EntityCreated<Key>>::new(Arc::new(store.clone()));
        let principal_id = PrincipalId::new();
        let ctx = RequestContext::new(ActingPrincipal::new(principal_id, "alice"));
        let key = Key {
            id: EntityId::new(),
            value: "secret".into(),
        };

        handler.handle(&ctx, &EntityCreated::new(key.clone())).await.unwrap();

        let records = store.all_records().await;
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.event_type, "CreatedKeyEvent");
        assert_eq!(record.event_kind, EventKind::Created);
        assert_eq!(record.entity_id, key.id);
        assert_eq!(record.entity_type, "Key");
        assert_eq!(record.principal_id, principal_id);
        assert_eq!(record.principal_name, "alice");
        assert_eq!(record.payload["entity"]["value"], "secret");
        assert_eq!(
            record.metadata["request_id"],
            serde_json::json!(ctx.request_id())
        );
    }

    #[tokio::test]
    async fn removed_event_lands_in_entity_history() {
        let store = InMemoryEventStore::new();
        let handler = StoreEventHandler::<EntityRemoved<Key>>::new(Arc::new(store.clone()));
        let ctx = RequestContext::new(ActingPrincipal::anonymous());
        let id = EntityId::new();

        handler
            .handle(&ctx, &EntityRemoved::<Key>::new(id, None))
            .await
            .unwrap();

        let history = store.history_for_entity(id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].event_type, "RemovedKeyEvent");
    }
}
