//! # Actor Framework
//!
//! Building blocks for type-safe, concurrent actor systems. It pairs a
//! **Resource-Oriented Architecture (ROA)** surface (Create, Get, Update, Delete on
//! well-defined resources) with the **Actor Model** (isolated state, message passing,
//! sequential processing per actor).
//!
//! Each resource type (stock record, cart, saved cart, order) gets its own actor with
//! isolated state. When resources interact, e.g. a cart claiming stock, they exchange
//! **Action messages** rather than sharing memory.
//!
//! **Further Reading**:
//! - [Actor Model (Wikipedia)](https://en.wikipedia.org/wiki/Actor_model)
//! - [Actors in Rust](https://ryhl.io/blog/actors-with-tokio/) - Practical guide to implementing actors with Tokio
//!
//! ## Architecture Overview
//!
//! 1. **Entity Layer** ([`ActorEntity`]) - domain state and behaviour
//! 2. **Runtime Layer** ([`ResourceActor`]) - message processing and concurrency
//! 3. **Interface Layer** ([`ResourceClient`]) - type-safe communication
//!
//! ## Defining an entity
//!
//! ```rust,ignore
//! #[async_trait]
//! impl ActorEntity for StockRecord {
//!     type Id = ProductId;
//!     type Create = StockCreate;
//!     type Update = StockUpdate;
//!     type Action = LedgerAction;
//!     type ActionResult = LedgerOutcome;
//!     type Context = ();
//!     type Error = LedgerError;
//!
//!     fn from_create_params(id: ProductId, params: StockCreate) -> Result<Self, LedgerError> {
//!         Ok(StockRecord::new(id, params.external_sellable))
//!     }
//!
//!     fn implicit(id: &ProductId) -> Option<Self> {
//!         Some(StockRecord::new(id.clone(), 0))
//!     }
//!
//!     async fn on_update(&mut self, update: StockUpdate, _: &()) -> Result<(), LedgerError> { .. }
//!     async fn handle_action(&mut self, action: LedgerAction, _: &()) -> Result<LedgerOutcome, LedgerError> { .. }
//! }
//! ```
//!
//! ## Context Injection Pattern
//!
//! Dependencies are injected at **runtime** via `run()`, not at construction time, so
//! actors can be created first and wired afterwards:
//!
//! ```rust,ignore
//! let (ledger_actor, ledger) = ResourceActor::<StockRecord>::new(32);
//! let (cart_actor, carts) = ResourceActor::<Cart>::new(32);
//!
//! tokio::spawn(ledger_actor.run(()));
//! tokio::spawn(cart_actor.run(CartContext { ledger: ledger.clone(), .. }));
//! ```
//!
//! ## Concurrency Model
//!
//! - Each actor runs in its own Tokio task
//! - Messages are processed **sequentially** within an actor
//! - Multiple actors run in **parallel**
//! - Shutdown is implicit: an actor stops once every client clone is dropped
//!
//! ## Testing
//!
//! [`mock::MockClient`] hands out a real `ResourceClient<T>` answered from canned
//! expectations, so an actor's dependencies can be replaced without spawning them.

pub mod actor;
pub mod client;
pub mod client_trait;
pub mod entity;
pub mod error;
pub mod message;
pub mod mock;
pub mod tracing;

// Re-export core types for convenience
pub use actor::ResourceActor;
pub use client::ResourceClient;
pub use client_trait::ActorClient;
pub use entity::ActorEntity;
pub use error::FrameworkError;
pub use message::{ResourceRequest, Response};
