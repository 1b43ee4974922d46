//! # Order Actor
//!
//! The order reservation controller: drives `reserved` stock on the ledger as an order is
//! placed, cancelled and fulfilled by the external system.
//!
//! ## Structure
//!
//! - [`entity`] - [`ActorEntity`](actor_framework::ActorEntity) implementation for [`Order`]
//! - [`error`] - [`OrderError`]
//! - [`actions`] - [`OrderAction`] and [`OrderActionResult`]
//! - [`new()`] - Factory function that creates the actor and client
//!
//! ## Reservations
//!
//! Each non-backorder line reserves `quantity × pack_size` units under a claim derived from
//! the order and line ids. Creating the order moves the line's cart hold into that claim in a
//! single ledger message, so a retried checkout can never reserve twice.
//!
//! ```rust,ignore
//! orders.create_order(order_id.clone(), params).await?;
//! orders.cancel(&order_id, None).await?;
//! orders.cancel(&order_id, None).await?; // no-op
//! ```

pub mod actions;
pub mod entity;
pub mod error;

pub use actions::*;
pub use error::*;

use crate::clients::LedgerClient;
use crate::clock::Clock;
use crate::model::Order;
use actor_framework::{ResourceActor, ResourceClient};
use std::sync::Arc;

/// Dependencies of the Order actor.
#[derive(Clone)]
pub struct OrderContext {
    pub ledger: LedgerClient,
    pub clock: Arc<dyn Clock>,
}

/// Creates a new Order actor and its client.
pub fn new(mailbox_size: usize) -> (ResourceActor<Order>, ResourceClient<Order>) {
    ResourceActor::new(mailbox_size)
}
