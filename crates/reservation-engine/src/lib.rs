//! # Reservation Engine Library
//!
//! Stock reservations for a storefront whose authoritative inventory lives in an external
//! system. Cart lines hold stock for a fixed window, placed orders reserve it until the
//! inventory system takes over, and every counter lives in a sharded ledger actor.
//!
//! This library exposes the core modules of the engine for the binary and integration tests.

pub mod cart_actor;
pub mod clients;
pub mod clock;
pub mod config;
pub mod gateway;
pub mod ledger_actor;
pub mod lifecycle;
pub mod model;
pub mod order_actor;
pub mod saved_cart_actor;
pub mod sync;
