//! # Reservation Engine
//!
//! Runs one storefront session end to end against the in-memory inventory system.
//!
//! ## Core Components
//!
//! - **[ledger_actor]**: per-product `held`/`reserved` counters, sharded across actors.
//! - **[cart_actor]** / **[saved_cart_actor]**: cart lines and the holds they carry.
//! - **[order_actor]**: reservations of placed orders and their external status.
//! - **[clients]**: typed wrappers plus the multi-cart and checkout services.
//! - **[sync]**: outbound order sync and inbound webhooks.
//! - **[lifecycle]**: wiring, the reservation clock and shutdown.
//!
//! ## Quick Start
//!
//! ```bash
//! RUST_LOG=info cargo run -p reservation-engine
//! ```

use actor_framework::tracing::setup_tracing;
use chrono::Utc;
use reservation_engine::clients::SessionContext;
use reservation_engine::clock::{self, Clock, ManualClock};
use reservation_engine::config::EngineConfig;
use reservation_engine::gateway::InMemoryGateway;
use reservation_engine::lifecycle::ReservationSystem;
use reservation_engine::model::{
    CartLineInput, Catalog, CatalogEntry, Destination, ExternalStatus, OrderId, OwnerId, ProductId,
    VariantId,
};
use reservation_engine::sync::TracingNotifier;
use std::sync::Arc;
use tracing::{info, Instrument};

#[tokio::main]
async fn main() -> Result<(), String> {
    // Setup tracing once for the entire application
    setup_tracing();

    let mut config = EngineConfig::from_env();
    config.webhook_secret = "demo-secret".to_string();

    let catalog = Arc::new(Catalog::new());
    catalog.register_product(ProductId(42), CatalogEntry::new("TEA-001", 12.5));
    catalog.register_variant(ProductId(42), VariantId(6), 6);
    catalog.register_product(ProductId(7), CatalogEntry::new("MUG-001", 8.0));

    let gateway = Arc::new(InMemoryGateway::new());
    gateway.set_sellable("TEA-001", 50);
    gateway.set_sellable("MUG-001", 10);

    let clock = Arc::new(ManualClock::new(Utc::now()));
    let mut system = ReservationSystem::new(
        config,
        catalog,
        gateway.clone(),
        Arc::new(TracingNotifier),
        clock.clone(),
    )
    .map_err(|e| e.to_string())?;
    system.start_clock();

    system
        .sync
        .refresh_products(&[ProductId(42), ProductId(7)])
        .await
        .map_err(|e| e.to_string())?;

    let mut ctx = SessionContext::new("demo", OwnerId(1));

    let span = tracing::info_span!("shopping");
    async {
        system
            .carts
            .add_line(&ctx.session_id, CartLineInput::variant(ProductId(42), VariantId(6), 2))
            .await?;
        system
            .carts
            .add_line(&ctx.session_id, CartLineInput::simple(ProductId(7), 1))
            .await?;
        for (key, remaining) in system.countdowns(&ctx.session_id).await? {
            info!(%key, remaining = %clock::format_countdown(remaining), "Reservation countdown");
        }
        Ok::<_, reservation_engine::cart_actor::CartError>(())
    }
    .instrument(span)
    .await
    .map_err(|e| e.to_string())?;

    let levels = system
        .ledger
        .levels(&ProductId(42))
        .await
        .map_err(|e| e.to_string())?;
    info!(held = levels.held, available = levels.available, "Tea after add to cart");

    // Save the cart under a name, then bring it back.
    system
        .multi_cart
        .save(&mut ctx, "weekly")
        .await
        .map_err(|e| e.to_string())?;
    system
        .multi_cart
        .load(&mut ctx, "weekly")
        .await
        .map_err(|e| e.to_string())?;

    clock.advance(chrono::Duration::minutes(5));

    let destination = Destination {
        name: "Ada Lovelace".to_string(),
        address1: "12 St James's Square".to_string(),
        city: "London".to_string(),
        state: "LND".to_string(),
        postcode: "SW1Y 4JH".to_string(),
        country: "GB".to_string(),
        email: "ada@example.com".to_string(),
        ..Destination::default()
    };
    let order = system
        .checkout
        .checkout(&mut ctx, OrderId(1001), destination)
        .await
        .map_err(|e| e.to_string())?;
    info!(order_id = %order.id, lines = order.lines.len(), "Order placed");

    let external = system
        .sync
        .create_or_update_external_order(&order.id)
        .await
        .map_err(|e| e.to_string())?;
    info!(external_id = %external.id, "Order sent to inventory system");

    // The warehouse picks the order up; the reservation is now theirs.
    if let Some(advanced) = gateway.advance_order(&external.id, ExternalStatus::Allocated) {
        system
            .sync
            .handle_external_status(&advanced.id, advanced.status)
            .await
            .map_err(|e| e.to_string())?;
    }

    let outcome = system
        .sync
        .cancel_order(&order.id, Some("customer request".to_string()))
        .await
        .map_err(|e| e.to_string())?;
    info!(?outcome, "Cancellation handled");

    let levels = system
        .ledger
        .levels(&ProductId(42))
        .await
        .map_err(|e| e.to_string())?;
    info!(?levels, now = %clock.now(), "Final tea levels");

    // Shutdown system gracefully
    system.shutdown().await?;

    info!("Application completed successfully");
    Ok(())
}
