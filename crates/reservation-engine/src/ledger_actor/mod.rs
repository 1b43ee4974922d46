//! # Stock Ledger
//!
//! The only owner of per-product `held` and `reserved` counters.
//!
//! ## Structure
//!
//! - [`entity`] - [`ActorEntity`](actor_framework::ActorEntity) implementation for [`StockRecord`]
//! - [`error`] - [`LedgerError`]
//! - [`actions`] - [`LedgerAction`] and [`LedgerActionResult`]
//! - [`spawn_sharded()`] - starts `N` shard actors and returns a routing [`LedgerClient`]
//!
//! ## Sharding
//!
//! Products are routed to one of `N` actors by a stable hash of the [`ProductId`]. A product
//! always lands on the same shard, so its updates are linearized by that shard's mailbox;
//! different products proceed in parallel and no message ever spans two products.
//!
//! ```rust,ignore
//! let (ledger, handles) = ledger_actor::spawn_sharded(4, 32);
//! ledger.refresh_external(&product_id, 50).await?;
//! ledger.try_set_hold(&product_id, claim, 12).await?;
//! assert_eq!(ledger.levels(&product_id).await?.available, 38);
//! ```

pub mod actions;
pub mod entity;
pub mod error;

pub use actions::*;
pub use error::*;

use crate::clients::LedgerClient;
use crate::model::StockRecord;
use actor_framework::{ResourceActor, ResourceClient};
use tokio::task::JoinHandle;

/// Creates a single ledger shard and its client.
pub fn new(mailbox_size: usize) -> (ResourceActor<StockRecord>, ResourceClient<StockRecord>) {
    ResourceActor::new(mailbox_size)
}

/// Spawns `shards` ledger actors (at least one) and returns the routing client.
pub fn spawn_sharded(shards: usize, mailbox_size: usize) -> (LedgerClient, Vec<JoinHandle<()>>) {
    let mut clients = Vec::with_capacity(shards.max(1));
    let mut handles = Vec::with_capacity(shards.max(1));
    for _ in 0..shards.max(1) {
        let (actor, client) = new(mailbox_size);
        handles.push(tokio::spawn(actor.run(())));
        clients.push(client);
    }
    (LedgerClient::new(clients), handles)
}
