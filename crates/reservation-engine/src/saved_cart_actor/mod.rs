//! # Saved Cart Actor
//!
//! Named snapshots of cart lines, keyed by owner and name.
//!
//! ## Structure
//!
//! - [`entity`] - [`ActorEntity`](actor_framework::ActorEntity) implementation for [`SavedCart`]
//! - [`error`] - [`SavedCartError`]
//! - [`actions`] - [`SavedCartAction`] and [`SavedCartActionResult`]
//! - [`new()`] - Factory function that creates the actor and client
//!
//! The state machine per name is `none → saved → loaded → (saved | deleted)`; "loaded" is
//! session state kept by the caller (see [`SessionContext`](crate::clients::SessionContext)),
//! not by this actor.

pub mod actions;
pub mod entity;
pub mod error;

pub use actions::*;
pub use error::*;

use crate::clients::LedgerClient;
use crate::model::SavedCart;
use actor_framework::{ResourceActor, ResourceClient};

/// Dependencies of the Saved Cart actor.
#[derive(Clone)]
pub struct SavedCartContext {
    pub ledger: LedgerClient,
}

/// Creates a new Saved Cart actor and its client.
pub fn new(mailbox_size: usize) -> (ResourceActor<SavedCart>, ResourceClient<SavedCart>) {
    ResourceActor::new(mailbox_size)
}
