//! # Generic Actor Server
//!
//! `ResourceActor` owns the in-memory store for one entity type and processes every
//! request sequentially. That sequential loop is the concurrency guarantee the rest of the
//! system leans on: two requests touching the same entity can never interleave.

use crate::client::ResourceClient;
use crate::entity::ActorEntity;
use crate::error::FrameworkError;
use crate::message::ResourceRequest;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// The generic actor that manages a collection of entities.
///
/// # Architecture Note
/// This is the "server" half of the actor. It owns the `store` and the receiving end of
/// the channel, so no `Mutex` or `RwLock` guards the entities: exclusive ownership inside
/// the task is the lock.
///
/// Hooks may `.await` other actors. While a hook is suspended this actor accepts no other
/// message, so an entity's multi-step operation (check, call out, record) is still atomic
/// with respect to every other request for the same actor.
///
/// # Usage Pattern
///
/// 1. **Create**: `ResourceActor::new()` returns the actor (server) and client (interface).
/// 2. **Wire**: pass dependencies (other clients) into `actor.run(context)`.
/// 3. **Run**: spawn the run loop in a background task.
///
/// ```rust,ignore
/// let (actor, client) = ResourceActor::<StockRecord>::new(32);
/// tokio::spawn(actor.run(()));
/// client.perform_action(product_id, LedgerAction::AdjustHeld(12)).await?;
/// ```
pub struct ResourceActor<T: ActorEntity> {
    receiver: mpsc::Receiver<ResourceRequest<T>>,
    store: HashMap<T::Id, T>,
}

impl<T: ActorEntity> ResourceActor<T> {
    /// Creates a new `ResourceActor` and its associated `ResourceClient`.
    ///
    /// `buffer_size` is the mailbox capacity; senders wait when it is full.
    pub fn new(buffer_size: usize) -> (Self, ResourceClient<T>) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let actor = Self {
            receiver,
            store: HashMap::new(),
        };
        (actor, ResourceClient::new(sender))
    }

    /// Runs the actor's event loop, processing messages until every client is dropped.
    ///
    /// # Context Injection
    /// `context` is handed to every hook. Dependencies created after the actor (other
    /// clients) are wired here, which keeps construction free of cycles.
    pub async fn run(mut self, context: T::Context) {
        let entity_type = entity_type::<T>();
        info!(entity_type, "Actor started");

        while let Some(msg) = self.receiver.recv().await {
            match msg {
                ResourceRequest::Create {
                    id,
                    params,
                    respond_to,
                } => {
                    let _ = respond_to.send(self.create(id, params, &context).await);
                }
                ResourceRequest::Get { id, respond_to } => {
                    let item = self.store.get(&id).cloned();
                    debug!(entity_type, %id, found = item.is_some(), "Get");
                    let _ = respond_to.send(Ok(item));
                }
                ResourceRequest::Update {
                    id,
                    update,
                    respond_to,
                } => {
                    let _ = respond_to.send(self.update(id, update, &context).await);
                }
                ResourceRequest::Delete { id, respond_to } => {
                    let _ = respond_to.send(self.delete(id, &context).await);
                }
                ResourceRequest::Action {
                    id,
                    action,
                    respond_to,
                } => {
                    let _ = respond_to.send(self.action(id, action, &context).await);
                }
                ResourceRequest::List { respond_to } => {
                    debug!(entity_type, size = self.store.len(), "List");
                    let _ = respond_to.send(Ok(self.store.values().cloned().collect()));
                }
                ResourceRequest::ForEach { action, respond_to } => {
                    let _ = respond_to.send(Ok(self.for_each(action, &context).await));
                }
            }
        }

        info!(entity_type, size = self.store.len(), "Shutdown");
    }

    async fn create(
        &mut self,
        id: T::Id,
        params: T::Create,
        context: &T::Context,
    ) -> Result<T::Id, FrameworkError> {
        let entity_type = entity_type::<T>();
        debug!(entity_type, %id, ?params, "Create");
        if self.store.contains_key(&id) {
            warn!(entity_type, %id, "Already exists");
            return Err(FrameworkError::AlreadyExists(id.to_string()));
        }

        let mut item = T::from_create_params(id.clone(), params).map_err(|e| {
            warn!(entity_type, %id, error = %e, "Create failed");
            FrameworkError::entity(e)
        })?;
        if let Err(e) = item.on_create(context).await {
            warn!(entity_type, %id, error = %e, "on_create failed");
            return Err(FrameworkError::entity(e));
        }

        self.store.insert(id.clone(), item);
        info!(entity_type, %id, size = self.store.len(), "Created");
        Ok(id)
    }

    async fn update(
        &mut self,
        id: T::Id,
        update: T::Update,
        context: &T::Context,
    ) -> Result<T, FrameworkError> {
        let entity_type = entity_type::<T>();
        debug!(entity_type, %id, ?update, "Update");
        let Some(item) = self.store.get_mut(&id) else {
            warn!(entity_type, %id, "Not found");
            return Err(FrameworkError::NotFound(id.to_string()));
        };
        if let Err(e) = item.on_update(update, context).await {
            warn!(entity_type, %id, error = %e, "Update failed");
            return Err(FrameworkError::entity(e));
        }
        info!(entity_type, %id, "Updated");
        Ok(item.clone())
    }

    async fn delete(&mut self, id: T::Id, context: &T::Context) -> Result<(), FrameworkError> {
        let entity_type = entity_type::<T>();
        debug!(entity_type, %id, "Delete");
        let Some(item) = self.store.get(&id) else {
            warn!(entity_type, %id, "Not found");
            return Err(FrameworkError::NotFound(id.to_string()));
        };
        if let Err(e) = item.on_delete(context).await {
            warn!(entity_type, %id, error = %e, "on_delete failed");
            return Err(FrameworkError::entity(e));
        }
        self.store.remove(&id);
        info!(entity_type, %id, size = self.store.len(), "Deleted");
        Ok(())
    }

    async fn action(
        &mut self,
        id: T::Id,
        action: T::Action,
        context: &T::Context,
    ) -> Result<T::ActionResult, FrameworkError> {
        let entity_type = entity_type::<T>();
        debug!(entity_type, %id, ?action, "Action");
        if !self.store.contains_key(&id) {
            match T::implicit(&id) {
                Some(fresh) => {
                    debug!(entity_type, %id, "Materialized implicit entity");
                    self.store.insert(id.clone(), fresh);
                }
                None => {
                    warn!(entity_type, %id, "Not found");
                    return Err(FrameworkError::NotFound(id.to_string()));
                }
            }
        }

        let Some(item) = self.store.get_mut(&id) else {
            return Err(FrameworkError::NotFound(id.to_string()));
        };
        let result = item
            .handle_action(action, context)
            .await
            .map_err(FrameworkError::entity);
        match &result {
            Ok(_) => info!(entity_type, %id, "Action ok"),
            Err(e) => warn!(entity_type, %id, error = %e, "Action failed"),
        }
        self.retire(&id);
        result
    }

    async fn for_each(
        &mut self,
        action: T::Action,
        context: &T::Context,
    ) -> Vec<(T::Id, Result<T::ActionResult, FrameworkError>)> {
        let entity_type = entity_type::<T>();
        debug!(entity_type, ?action, size = self.store.len(), "ForEach");

        let mut results = Vec::with_capacity(self.store.len());
        for (id, item) in self.store.iter_mut() {
            let result = item
                .handle_action(action.clone(), context)
                .await
                .map_err(FrameworkError::entity);
            if let Err(e) = &result {
                warn!(entity_type, %id, error = %e, "Broadcast action failed");
            }
            results.push((id.clone(), result));
        }

        let retired: Vec<T::Id> = self
            .store
            .iter()
            .filter(|(_, item)| item.is_retired())
            .map(|(id, _)| id.clone())
            .collect();
        for id in retired {
            self.retire(&id);
        }
        results
    }

    fn retire(&mut self, id: &T::Id) {
        if self.store.get(id).is_some_and(|item| item.is_retired()) {
            self.store.remove(id);
            info!(entity_type = entity_type::<T>(), %id, size = self.store.len(), "Retired");
        }
    }
}

/// Short type name for log fields ("Cart" rather than "reservation_engine::model::cart::Cart").
fn entity_type<T>() -> &'static str {
    std::any::type_name::<T>()
        .split("::")
        .last()
        .unwrap_or("Unknown")
}
