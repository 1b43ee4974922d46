//! # System Lifecycle & Orchestration
//!
//! Starting, wiring and shutting down the reservation engine's actors, plus the background
//! reservation clock.
//!
//! ## Wiring
//!
//! ```text
//! ledger shards ◄── cart actor ◄── CartClient ◄── MultiCartStore, CheckoutService, Sweeper
//!               ◄── saved cart actor ◄── SavedCartClient
//!               ◄── order actor ◄── OrderClient ◄── OrderSyncCoordinator ◄── WebhookHandler
//! ```
//!
//! Actors are created first and receive their dependencies through `run(context)`, so the
//! graph stays acyclic and shutdown by dropping clients terminates every actor.
//!
//! ## Reservation clock
//!
//! [`ReservationClock`] calls [`Sweeper::sweep_now`] on a fixed interval. Page loads call
//! [`Sweeper::sweep_session`] for their own cart; both are safe to run at the same time.

pub mod sweeper;
pub mod system;

pub use sweeper::*;
pub use system::*;
