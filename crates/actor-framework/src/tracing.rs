//! # Observability & Tracing
//!
//! Structured logging for every actor in the process.
//!
//! The actor loop logs each request with an `entity_type` field (`StockRecord`, `Cart`,
//! `SavedCart`, `Order`) and the entity id, so the module path is redundant and hidden.
//! Client wrappers add `#[instrument]` spans, which the compact format renders inline:
//!
//! ```text
//! INFO checkout:convert_cart: Created entity_type="Order" id=order_1001 size=1
//! INFO Action ok entity_type="StockRecord" id=product_42
//! ```
//!
//! ```bash
//! RUST_LOG=info cargo run                       # one line per state change
//! RUST_LOG=debug cargo run                      # full request payloads
//! RUST_LOG=reservation_engine=debug cargo run   # engine only
//! ```

/// Installs the global `tracing` subscriber, filtered by `RUST_LOG`.
///
/// Safe to call more than once; later calls are ignored, which keeps tests that each call
/// it from panicking.
pub fn setup_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .try_init();
}
