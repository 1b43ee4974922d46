//! # Order Sync
//!
//! Keeps local orders and the external inventory system in step:
//!
//! - [`OrderSyncCoordinator`] pushes orders out, refreshes sellable quantities afterwards,
//!   and turns gateway failures into an order note plus an operator notification
//! - [`WebhookHandler`] accepts signed pushes from the inventory system
//!
//! Local ledger updates and gateway calls are always separate steps; nothing is held across a
//! network round trip.

mod coordinator;
mod notifier;
mod webhook;

pub use coordinator::*;
pub use notifier::*;
pub use webhook::*;
