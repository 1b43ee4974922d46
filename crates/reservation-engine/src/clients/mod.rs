//! # Clients
//!
//! Typed wrappers over each actor's `ResourceClient`, plus the services that coordinate
//! several actors for one host-platform operation.
//!
//! - [`LedgerClient`] routes per-product messages to the ledger shards
//! - [`CartClient`] one method per cart event
//! - [`SavedCartClient`] and [`MultiCartStore`] named carts
//! - [`OrderClient`] and [`CheckoutService`] order placement and lifecycle

mod cart_client;
mod checkout;
mod ledger_client;
mod multi_cart;
mod order_client;
mod saved_cart_client;

pub use cart_client::*;
pub use checkout::*;
pub use ledger_client::*;
pub use multi_cart::*;
pub use order_client::*;
pub use saved_cart_client::*;
