//! # Cart Actor
//!
//! The cart reservation controller: drives `held` stock on the ledger as lines are added,
//! re-quantified, removed, expired, saved, loaded and checked out.
//!
//! ## Structure
//!
//! - [`entity`] - [`ActorEntity`](actor_framework::ActorEntity) implementation for [`Cart`]
//! - [`error`] - [`CartError`]
//! - [`actions`] - [`CartAction`] and [`CartActionResult`]
//! - [`new()`] - Factory function that creates the actor and client
//!
//! ## Holds
//!
//! A line holds `quantity × pack_size` base units under its own claim. The claim is created
//! when the line is first added and travels with the line, so saving, loading and checking
//! out never double count. Products flagged for backorders skip the ledger entirely.
//!
//! ```rust,ignore
//! let line = carts.add_line(&session, CartLineInput::variant(ProductId(42), VariantId(7), 3)).await?;
//! assert_eq!(line.units(), 12); // pack size 4
//! carts.remove_line(&session, &line.key).await?;
//! ```

pub mod actions;
pub mod entity;
pub mod error;

pub use actions::*;
pub use error::*;

use crate::clients::LedgerClient;
use crate::clock::Clock;
use crate::model::{Cart, Catalog};
use actor_framework::{ResourceActor, ResourceClient};
use chrono::Duration;
use std::sync::Arc;

/// Dependencies of the Cart actor.
#[derive(Clone)]
pub struct CartContext {
    pub ledger: LedgerClient,
    pub catalog: Arc<Catalog>,
    pub clock: Arc<dyn Clock>,
    /// Reservation window applied to newly added lines.
    pub window: Duration,
}

/// Creates a new Cart actor and its client.
pub fn new(mailbox_size: usize) -> (ResourceActor<Cart>, ResourceClient<Cart>) {
    ResourceActor::new(mailbox_size)
}
