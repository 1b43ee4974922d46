//! # ActorEntity Trait
//!
//! The `ActorEntity` trait is the contract every resource (stock record, cart, saved cart,
//! order, …) implements to be owned by a generic [`ResourceActor`](crate::ResourceActor).
//! It names the associated types for ids, DTOs, actions, context and errors, and provides
//! the lifecycle hooks the actor calls while processing messages.
//!
//! # Keys
//! Entities are keyed by caller-supplied ids. A stock record is keyed by its product, a cart
//! by its session, an order by the host platform's order number. The actor never invents ids.
//!
//! # Implicit entities
//! Some resources exist conceptually before anyone creates them (an empty cart, a product's
//! zeroed counters). Such entities override [`ActorEntity::implicit`]; the actor then
//! materializes them on the first `Action` addressed to an unknown id instead of answering
//! `NotFound`.
//!
//! # Retirement
//! After every action the actor asks [`ActorEntity::is_retired`]. A retired entity is dropped
//! from the store in the same message, so nothing can observe it half-removed.

use async_trait::async_trait;
use std::fmt::{Debug, Display};
use std::hash::Hash;

/// Trait that any resource entity must implement to be managed by a `ResourceActor`.
///
/// # Async & Context
/// Hooks are `async` so an entity can call other actors while handling a message (a cart
/// claiming stock from the ledger, an order converting holds into reservations). The
/// `Context` holds those dependencies and is injected through `run()` rather than `new()`.
#[async_trait]
pub trait ActorEntity: Clone + Send + Sync + 'static {
    /// The unique identifier for this entity.
    type Id: Eq + Hash + Clone + Send + Sync + Display + Debug;

    /// The data required to create a new instance.
    type Create: Send + Sync + Debug;

    /// The data required to update an existing instance.
    type Update: Send + Sync + Debug;

    /// Enum representing resource-specific operations.
    ///
    /// `Clone` is required so one action can be broadcast to every entity (see
    /// [`ResourceRequest::ForEach`](crate::ResourceRequest::ForEach)).
    type Action: Clone + Send + Sync + Debug;

    /// The result type returned by custom actions.
    type ActionResult: Send + Sync + Debug;

    /// The runtime context (dependencies) injected into the actor.
    /// Use `()` if no dependencies are needed.
    type Context: Send + Sync;

    /// The error type for this entity.
    ///
    /// One error enum per actor rather than one per message: clients match on a single
    /// type, at the cost of every action nominally being able to return every variant.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Construct the full entity from the id and payload.
    /// Called synchronously before `on_create`.
    fn from_create_params(id: Self::Id, params: Self::Create) -> Result<Self, Self::Error>;

    /// Returns the entity to materialize when an action targets an unknown id.
    ///
    /// The default is `None`, which makes such actions fail with `NotFound`.
    fn implicit(_id: &Self::Id) -> Option<Self> {
        None
    }

    /// Whether the entity should be dropped from the store after the current action.
    fn is_retired(&self) -> bool {
        false
    }

    // --- Lifecycle Hooks (Async) ---

    /// Called after the entity is constructed and before it is stored.
    /// Failing here aborts the creation.
    async fn on_create(&mut self, _ctx: &Self::Context) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Called when an update request is received.
    async fn on_update(
        &mut self,
        update: Self::Update,
        _ctx: &Self::Context,
    ) -> Result<(), Self::Error>;

    /// Called immediately before the entity is removed by an explicit `Delete`.
    /// Failing here keeps the entity in place.
    async fn on_delete(&self, _ctx: &Self::Context) -> Result<(), Self::Error> {
        Ok(())
    }

    // --- Action Handler (Async) ---

    /// Handle a custom resource-specific action.
    async fn handle_action(
        &mut self,
        action: Self::Action,
        _ctx: &Self::Context,
    ) -> Result<Self::ActionResult, Self::Error>;
}
