use actor_framework::ActorClient;
use chrono::{Duration, TimeZone, Utc};
use reservation_engine::cart_actor::CartError;
use reservation_engine::clients::{MultiCartError, SessionContext};
use reservation_engine::clock::ManualClock;
use reservation_engine::config::EngineConfig;
use reservation_engine::gateway::{GatewayError, InMemoryGateway};
use reservation_engine::lifecycle::ReservationSystem;
use reservation_engine::model::{
    CartLineInput, Catalog, CatalogEntry, Destination, ExternalStatus, OrderId, OrderStatus,
    OwnerId, ProductId, StockLevels, VariantId,
};
use reservation_engine::sync::{sign, CancelOutcome, RecordingNotifier, SyncError, WebhookOutcome};
use std::sync::Arc;

const TEA: ProductId = ProductId(1);
const WINE: ProductId = ProductId(2);
const POSTER: ProductId = ProductId(3);
const CASE_OF_4: VariantId = VariantId(4);
const CASE_OF_6: VariantId = VariantId(6);
const SECRET: &str = "whsec_test";

struct Harness {
    system: ReservationSystem,
    gateway: Arc<InMemoryGateway>,
    notifier: Arc<RecordingNotifier>,
    clock: Arc<ManualClock>,
}

/// Full system with real actors, an in-memory inventory system and a manual clock.
///
/// Tea and wine start at 50 sellable units, the poster is a backorder product.
async fn harness() -> Harness {
    let mut config = EngineConfig::default();
    config.actors.ledger_shards = 2;
    config.webhook_secret = SECRET.to_string();

    let catalog = Arc::new(Catalog::new());
    catalog.register_product(TEA, CatalogEntry::new("TEA-001", 10.0));
    catalog.register_variant(TEA, CASE_OF_4, 4);
    catalog.register_product(WINE, CatalogEntry::new("WINE-001", 20.0));
    catalog.register_variant(WINE, CASE_OF_6, 6);
    catalog.register_product(POSTER, CatalogEntry::new("POSTER-001", 5.0).with_backorders());

    let gateway = Arc::new(InMemoryGateway::new());
    gateway.set_sellable("TEA-001", 50);
    gateway.set_sellable("WINE-001", 50);

    let notifier = Arc::new(RecordingNotifier::new());
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
    ));
    let system = ReservationSystem::new(
        config,
        catalog,
        gateway.clone(),
        notifier.clone(),
        clock.clone(),
    )
    .expect("Failed to start system");

    system
        .sync
        .refresh_products(&[TEA, WINE])
        .await
        .expect("Failed to seed stock");

    Harness {
        system,
        gateway,
        notifier,
        clock,
    }
}

fn destination() -> Destination {
    Destination {
        name: "Ada Lovelace".to_string(),
        address1: "12 St James's Square".to_string(),
        city: "London".to_string(),
        state: "LND".to_string(),
        postcode: "SW1Y 4JH".to_string(),
        country: "GB".to_string(),
        email: "ada@example.com".to_string(),
        ..Destination::default()
    }
}

async fn levels(system: &ReservationSystem, product_id: ProductId) -> StockLevels {
    system
        .ledger
        .levels(&product_id)
        .await
        .expect("Failed to read levels")
}

#[tokio::test]
async fn test_add_then_remove_conserves_availability() {
    let h = harness().await;
    let session = SessionContext::new("s1", OwnerId(1)).session_id;

    let line = h
        .system
        .carts
        .add_line(&session, CartLineInput::variant(TEA, CASE_OF_4, 3))
        .await
        .expect("Failed to add line");
    assert_eq!(line.units(), 12);

    let held = levels(&h.system, TEA).await;
    assert_eq!(held.held, 12);
    assert_eq!(held.available, 38);

    let removed = h
        .system
        .carts
        .remove_line(&session, &line.key)
        .await
        .expect("Failed to remove line");
    assert!(removed.is_some());

    let released = levels(&h.system, TEA).await;
    assert_eq!(released.held, 0);
    assert_eq!(released.available, 50);

    h.system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_pack_size_multiplies_hold() {
    let h = harness().await;
    let session = SessionContext::new("s1", OwnerId(1)).session_id;

    h.system
        .carts
        .add_line(&session, CartLineInput::variant(WINE, CASE_OF_6, 2))
        .await
        .unwrap();
    assert_eq!(levels(&h.system, WINE).await.held, 12);

    // Increases are checked against availability in base units.
    let key = h.system.carts.lines(&session).await.unwrap()[0].key.clone();
    let err = h
        .system
        .carts
        .change_quantity(&session, &key, 9)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        reservation_engine::cart_actor::CartError::InsufficientStock {
            requested: 42,
            available: 38
        }
    );
    assert_eq!(levels(&h.system, WINE).await.held, 12);

    h.system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_expired_line_is_released_once() {
    let h = harness().await;
    let session = SessionContext::new("s1", OwnerId(1)).session_id;

    h.system
        .carts
        .add_line(&session, CartLineInput::simple(TEA, 5))
        .await
        .unwrap();
    assert_eq!(levels(&h.system, TEA).await.held, 5);

    h.clock.advance(Duration::minutes(19));
    let early = h.system.sweeper.sweep_now().await.unwrap();
    assert!(!early.any_removed());

    h.clock.advance(Duration::minutes(2));
    let first = h.system.sweeper.sweep_now().await.unwrap();
    assert_eq!(first.cart_lines.len(), 1);
    assert_eq!(first.cart_lines[0].0, session);

    let second = h.system.sweeper.sweep_now().await.unwrap();
    assert!(!second.any_removed());

    let after = levels(&h.system, TEA).await;
    assert_eq!(after.held, 0);
    assert_eq!(after.available, 50);
    assert!(h.system.carts.lines(&session).await.unwrap().is_empty());

    h.system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_save_load_round_trip_keeps_holds_and_expiry() {
    let h = harness().await;
    let mut ctx = SessionContext::new("s1", OwnerId(7));

    h.system
        .carts
        .add_line(&ctx.session_id, CartLineInput::simple(TEA, 3))
        .await
        .unwrap();
    h.system
        .carts
        .add_line(&ctx.session_id, CartLineInput::variant(WINE, CASE_OF_6, 1))
        .await
        .unwrap();
    let before = h.system.carts.lines(&ctx.session_id).await.unwrap();

    let saved = h.system.multi_cart.save(&mut ctx, "A").await.unwrap();
    assert_eq!(saved.lines.len(), 2);
    assert!(h.system.carts.lines(&ctx.session_id).await.unwrap().is_empty());
    assert_eq!(levels(&h.system, TEA).await.held, 3);
    assert_eq!(levels(&h.system, WINE).await.held, 6);

    let err = h.system.multi_cart.save(&mut ctx, "A").await.unwrap_err();
    assert_eq!(err, MultiCartError::NameTaken("user_7/A".to_string()));

    h.clock.advance(Duration::minutes(3));
    let loaded = h.system.multi_cart.load(&mut ctx, "A").await.unwrap();
    assert_eq!(ctx.loaded_cart_name.as_deref(), Some("A"));
    assert_eq!(loaded.lines.len(), 2);
    assert!(loaded.dropped.is_empty());
    for line in &before {
        let same = loaded
            .lines
            .iter()
            .find(|loaded| loaded.key == line.key)
            .expect("Line missing after load");
        assert_eq!(same.expires_at, line.expires_at);
        assert_eq!(same.units(), line.units());
    }
    assert_eq!(levels(&h.system, TEA).await.held, 3);
    assert_eq!(levels(&h.system, WINE).await.held, 6);

    let names: Vec<String> = h
        .system
        .multi_cart
        .list(&OwnerId(7))
        .await
        .unwrap()
        .iter()
        .map(|cart| cart.name().to_string())
        .collect();
    assert_eq!(names, vec!["A".to_string()]);

    h.system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_deleting_saved_cart_releases_its_holds() {
    let h = harness().await;
    let mut ctx = SessionContext::new("s1", OwnerId(7));

    h.system
        .carts
        .add_line(&ctx.session_id, CartLineInput::simple(TEA, 4))
        .await
        .unwrap();
    h.system.multi_cart.save(&mut ctx, "later").await.unwrap();
    assert_eq!(levels(&h.system, TEA).await.held, 4);

    h.system.multi_cart.delete(&mut ctx, "later").await.unwrap();
    assert_eq!(levels(&h.system, TEA).await.held, 0);

    let err = h.system.multi_cart.load(&mut ctx, "later").await.unwrap_err();
    assert!(matches!(err, MultiCartError::NotFound(_)));

    h.system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_checkout_converts_holds_to_reservations() {
    let h = harness().await;
    let mut ctx = SessionContext::new("s1", OwnerId(1));

    h.system
        .carts
        .add_line(&ctx.session_id, CartLineInput::simple(TEA, 5))
        .await
        .unwrap();
    assert_eq!(levels(&h.system, TEA).await.held, 5);

    let order = h
        .system
        .checkout
        .checkout(&mut ctx, OrderId(1001), destination())
        .await
        .expect("Checkout failed");
    assert_eq!(order.status, OrderStatus::Processing);
    assert_eq!(order.lines[0].reserved_qty, 5);

    let after = levels(&h.system, TEA).await;
    assert_eq!(after.held, 0);
    assert_eq!(after.reserved, 5);
    assert_eq!(after.display, 45);
    assert!(h.system.carts.lines(&ctx.session_id).await.unwrap().is_empty());

    h.system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_checkout_rejects_missing_destination_fields() {
    let h = harness().await;
    let mut ctx = SessionContext::new("s1", OwnerId(1));
    h.system
        .carts
        .add_line(&ctx.session_id, CartLineInput::simple(TEA, 2))
        .await
        .unwrap();

    let mut incomplete = destination();
    incomplete.email = String::new();
    let err = h
        .system
        .checkout
        .checkout(&mut ctx, OrderId(1), incomplete)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        reservation_engine::clients::CheckoutError::MissingFields(vec!["email"])
    );

    // Nothing moved.
    assert_eq!(h.system.carts.lines(&ctx.session_id).await.unwrap().len(), 1);
    assert_eq!(levels(&h.system, TEA).await.held, 2);

    h.system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_checkout_of_loaded_cart_destroys_it() {
    let h = harness().await;
    let mut ctx = SessionContext::new("s1", OwnerId(7));

    h.system
        .carts
        .add_line(&ctx.session_id, CartLineInput::simple(TEA, 3))
        .await
        .unwrap();
    h.system.multi_cart.save(&mut ctx, "A").await.unwrap();
    h.system.multi_cart.load(&mut ctx, "A").await.unwrap();

    h.system
        .checkout
        .checkout(&mut ctx, OrderId(5), destination())
        .await
        .unwrap();

    assert_eq!(ctx.loaded_cart_name, None);
    assert!(h.system.multi_cart.list(&OwnerId(7)).await.unwrap().is_empty());
    let after = levels(&h.system, TEA).await;
    assert_eq!(after.held, 0);
    assert_eq!(after.reserved, 3);

    h.system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_cancel_twice_releases_once() {
    let h = harness().await;
    let mut ctx = SessionContext::new("s1", OwnerId(1));
    h.system
        .carts
        .add_line(&ctx.session_id, CartLineInput::simple(TEA, 5))
        .await
        .unwrap();
    let order = h
        .system
        .checkout
        .checkout(&mut ctx, OrderId(9), destination())
        .await
        .unwrap();

    assert!(h.system.orders.cancel(&order.id, None).await.unwrap());
    let once = levels(&h.system, TEA).await;
    assert!(!h.system.orders.cancel(&order.id, None).await.unwrap());
    let twice = levels(&h.system, TEA).await;

    assert_eq!(once.reserved, 0);
    assert_eq!(once, twice);
    let cancelled = h.system.orders.get(order.id.clone()).await.unwrap().unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);

    h.system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_backorder_products_never_touch_the_ledger() {
    let h = harness().await;
    let mut ctx = SessionContext::new("s1", OwnerId(1));

    let line = h
        .system
        .carts
        .add_line(&ctx.session_id, CartLineInput::simple(POSTER, 500))
        .await
        .unwrap();
    assert!(!line.held);
    h.system
        .carts
        .change_quantity(&ctx.session_id, &line.key, 800)
        .await
        .unwrap();

    let order = h
        .system
        .checkout
        .checkout(&mut ctx, OrderId(3), destination())
        .await
        .unwrap();
    assert!(order.lines[0].backorder);
    h.system.orders.cancel(&order.id, None).await.unwrap();

    let poster = levels(&h.system, POSTER).await;
    assert_eq!(poster.held, 0);
    assert_eq!(poster.reserved, 0);

    h.system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_sync_failure_notes_order_and_notifies_operator() {
    let h = harness().await;
    let mut ctx = SessionContext::new("s1", OwnerId(1));
    h.system
        .carts
        .add_line(&ctx.session_id, CartLineInput::simple(TEA, 2))
        .await
        .unwrap();
    let order = h
        .system
        .checkout
        .checkout(&mut ctx, OrderId(11), destination())
        .await
        .unwrap();

    h.gateway.set_failing(true);
    let err = h
        .system
        .sync
        .create_or_update_external_order(&order.id)
        .await
        .unwrap_err();
    assert_eq!(err, SyncError::Gateway(GatewayError::Unavailable));

    let stored = h.system.orders.get(order.id.clone()).await.unwrap().unwrap();
    assert_eq!(stored.external_id, None);
    assert!(stored
        .notes
        .iter()
        .any(|note| note.message.contains("Inventory sync failed")));
    assert_eq!(h.notifier.sent().len(), 1);
    assert_eq!(levels(&h.system, TEA).await.reserved, 2);

    // Manual re-sync once the inventory system is back.
    h.gateway.set_failing(false);
    let external = h.system.sync.resync(&order.id).await.unwrap();
    assert_eq!(external.status, ExternalStatus::Created);
    let stored = h.system.orders.get(order.id.clone()).await.unwrap().unwrap();
    assert_eq!(stored.external_id, Some(external.id));

    h.system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_advanced_external_order_is_cancelled_locally_only() {
    let h = harness().await;
    let mut ctx = SessionContext::new("s1", OwnerId(1));
    h.system
        .carts
        .add_line(&ctx.session_id, CartLineInput::simple(TEA, 5))
        .await
        .unwrap();
    let order = h
        .system
        .checkout
        .checkout(&mut ctx, OrderId(21), destination())
        .await
        .unwrap();
    let external = h
        .system
        .sync
        .create_or_update_external_order(&order.id)
        .await
        .unwrap();

    let allocated = h
        .gateway
        .advance_order(&external.id, ExternalStatus::Allocated)
        .unwrap();
    let matched = h
        .system
        .sync
        .handle_external_status(&allocated.id, allocated.status)
        .await
        .unwrap();
    assert_eq!(matched, Some(order.id.clone()));

    // The warehouse owns those units now.
    let taken_over = levels(&h.system, TEA).await;
    assert_eq!(taken_over.reserved, 0);
    assert_eq!(taken_over.external_sellable, 45);
    assert_eq!(taken_over.display, 45);

    let outcome = h
        .system
        .sync
        .cancel_order(&order.id, Some("changed mind".to_string()))
        .await
        .unwrap();
    assert_eq!(
        outcome,
        CancelOutcome {
            released: false,
            external_cancelled: false
        }
    );
    assert_eq!(
        h.gateway.order(&external.id).map(|order| order.status),
        Some(ExternalStatus::Allocated)
    );

    let stored = h.system.orders.get(order.id.clone()).await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatus::Cancelled);
    assert!(stored
        .notes
        .iter()
        .any(|note| note.message.contains("was not cancelled")));
    assert_eq!(levels(&h.system, TEA).await, taken_over);

    h.system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_cancel_before_allocation_cancels_externally() {
    let h = harness().await;
    let mut ctx = SessionContext::new("s1", OwnerId(1));
    h.system
        .carts
        .add_line(&ctx.session_id, CartLineInput::simple(WINE, 4))
        .await
        .unwrap();
    let order = h
        .system
        .checkout
        .checkout(&mut ctx, OrderId(22), destination())
        .await
        .unwrap();
    let external = h
        .system
        .sync
        .create_or_update_external_order(&order.id)
        .await
        .unwrap();

    let outcome = h.system.sync.cancel_order(&order.id, None).await.unwrap();
    assert_eq!(
        outcome,
        CancelOutcome {
            released: true,
            external_cancelled: true
        }
    );
    assert_eq!(
        h.gateway.order(&external.id).map(|order| order.status),
        Some(ExternalStatus::Cancelled)
    );
    assert_eq!(levels(&h.system, WINE).await.reserved, 0);

    h.system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_webhooks_refresh_stock_and_apply_order_status() {
    let h = harness().await;
    let mut ctx = SessionContext::new("s1", OwnerId(1));
    h.system
        .carts
        .add_line(&ctx.session_id, CartLineInput::simple(TEA, 2))
        .await
        .unwrap();
    let order = h
        .system
        .checkout
        .checkout(&mut ctx, OrderId(31), destination())
        .await
        .unwrap();
    let external = h
        .system
        .sync
        .create_or_update_external_order(&order.id)
        .await
        .unwrap();

    let summary = br#"{"resource_type":"inventory_summary","data":[
        {"sku":"TEA-001","sellable_qty":30},
        {"sku":"UNKNOWN","sellable_qty":3},
        {"sku":"WINE-001","sellable_qty":-1},
        {"nope":true}
    ]}"#;
    let signature = sign(SECRET.as_bytes(), summary);
    let outcome = h
        .system
        .webhooks
        .handle(summary, Some(&format!("sha256={signature}")))
        .await
        .unwrap();
    assert_eq!(
        outcome,
        WebhookOutcome::Inventory {
            refreshed: vec![TEA],
            skipped: 3
        }
    );
    assert_eq!(levels(&h.system, TEA).await.external_sellable, 30);
    assert_eq!(levels(&h.system, WINE).await.external_sellable, 50);

    let shipped = format!(
        r#"{{"resource_type":"order","data":{{"id":"{}","status":"Shipped"}}}}"#,
        external.id
    );
    let signature = sign(SECRET.as_bytes(), shipped.as_bytes());
    let outcome = h
        .system
        .webhooks
        .handle(shipped.as_bytes(), Some(&signature))
        .await
        .unwrap();
    assert_eq!(outcome, WebhookOutcome::Order(Some(order.id.clone())));

    let stored = h.system.orders.get(order.id.clone()).await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatus::Fulfilled);
    assert!(stored.stock_adjusted);
    assert_eq!(levels(&h.system, TEA).await.reserved, 0);

    h.system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_webhook_rejects_bad_signatures() {
    let h = harness().await;
    let body = br#"{"resource_type":"item","data":{}}"#;

    let missing = h.system.webhooks.handle(body, None).await.unwrap_err();
    assert_eq!(missing, reservation_engine::sync::WebhookError::MissingSignature);

    let forged = sign(b"someone-else", body);
    let invalid = h.system.webhooks.handle(body, Some(&forged)).await.unwrap_err();
    assert_eq!(invalid, reservation_engine::sync::WebhookError::InvalidSignature);

    let valid = sign(SECRET.as_bytes(), body);
    assert_eq!(
        h.system.webhooks.handle(body, Some(&valid)).await.unwrap(),
        WebhookOutcome::Ignored
    );

    h.system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_reservation_clock_sweeps_in_background() {
    let mut h = harness().await;
    h.system.config.reservation.sweep_interval_secs = 1;
    let session = SessionContext::new("s1", OwnerId(1)).session_id;

    h.system
        .carts
        .add_line(&session, CartLineInput::simple(TEA, 1))
        .await
        .unwrap();
    h.clock.advance(Duration::minutes(21));
    h.system.start_clock();

    // The first tick fires immediately.
    for _ in 0..50 {
        if levels(&h.system, TEA).await.held == 0 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    assert_eq!(levels(&h.system, TEA).await.held, 0);

    h.system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_repeated_checkout_returns_placed_order_and_leaves_cart_alone() {
    let h = harness().await;
    let mut ctx = SessionContext::new("s1", OwnerId(1));
    h.system
        .carts
        .add_line(&ctx.session_id, CartLineInput::simple(TEA, 5))
        .await
        .unwrap();
    let placed = h
        .system
        .checkout
        .checkout(&mut ctx, OrderId(1001), destination())
        .await
        .unwrap();

    // Retrying the same checkout succeeds without converting anything twice.
    let retried = h
        .system
        .checkout
        .checkout(&mut ctx, OrderId(1001), destination())
        .await
        .expect("Repeated checkout should succeed");
    assert_eq!(retried, placed);
    assert_eq!(levels(&h.system, TEA).await.reserved, 5);

    // A new cart checked out under the taken id keeps its lines and its holds.
    h.system
        .carts
        .add_line(&ctx.session_id, CartLineInput::simple(TEA, 7))
        .await
        .unwrap();
    let again = h
        .system
        .checkout
        .checkout(&mut ctx, OrderId(1001), destination())
        .await
        .unwrap();
    assert_eq!(again.lines.len(), 1);
    assert_eq!(again.lines[0].reserved_qty, 5);
    assert_eq!(h.system.carts.lines(&ctx.session_id).await.unwrap().len(), 1);
    let still_held = levels(&h.system, TEA).await;
    assert_eq!(still_held.held, 7);
    assert_eq!(still_held.reserved, 5);

    // Those holds still expire normally.
    h.clock.advance(Duration::minutes(60));
    h.system.sweeper.sweep_now().await.unwrap();
    let swept = levels(&h.system, TEA).await;
    assert_eq!(swept.held, 0);
    assert_eq!(swept.reserved, 5);

    h.system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_reload_does_not_hold_stock_taken_by_another_session() {
    let h = harness().await;
    h.system.ledger.refresh_external(&TEA, 5).await.unwrap();
    let mut ctx = SessionContext::new("s1", OwnerId(7));
    let other = SessionContext::new("s2", OwnerId(8));

    let line = h
        .system
        .carts
        .add_line(&ctx.session_id, CartLineInput::simple(TEA, 5))
        .await
        .unwrap();
    h.system.multi_cart.save(&mut ctx, "A").await.unwrap();
    h.system.multi_cart.load(&mut ctx, "A").await.unwrap();
    h.system
        .carts
        .remove_line(&ctx.session_id, &line.key)
        .await
        .unwrap();
    assert_eq!(levels(&h.system, TEA).await.held, 0);

    h.system
        .carts
        .add_line(&other.session_id, CartLineInput::simple(TEA, 5))
        .await
        .unwrap();

    let reloaded = h.system.multi_cart.load(&mut ctx, "A").await.unwrap();
    assert!(reloaded.lines.is_empty());
    assert_eq!(reloaded.dropped.len(), 1);
    assert_eq!(reloaded.dropped[0].key, line.key);

    let after = levels(&h.system, TEA).await;
    assert_eq!(after.held, 5);
    assert_eq!(after.available, 0);
    assert!(h.system.carts.lines(&ctx.session_id).await.unwrap().is_empty());
    assert!(h.system.multi_cart.list(&OwnerId(7)).await.unwrap().is_empty());
    assert_eq!(ctx.loaded_cart_name, None);

    h.system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_saving_loaded_lines_needs_stock_for_the_copy() {
    let h = harness().await;
    h.system.ledger.refresh_external(&TEA, 5).await.unwrap();
    let mut ctx = SessionContext::new("s1", OwnerId(7));

    h.system
        .carts
        .add_line(&ctx.session_id, CartLineInput::simple(TEA, 3))
        .await
        .unwrap();
    h.system.multi_cart.save(&mut ctx, "A").await.unwrap();
    h.system.multi_cart.load(&mut ctx, "A").await.unwrap();

    let err = h.system.multi_cart.save(&mut ctx, "B").await.unwrap_err();
    assert_eq!(
        err,
        MultiCartError::Cart(CartError::InsufficientStock {
            requested: 3,
            available: 2
        })
    );

    assert_eq!(h.system.carts.lines(&ctx.session_id).await.unwrap().len(), 1);
    assert_eq!(levels(&h.system, TEA).await.held, 3);
    let names: Vec<String> = h
        .system
        .multi_cart
        .list(&OwnerId(7))
        .await
        .unwrap()
        .iter()
        .map(|cart| cart.name().to_string())
        .collect();
    assert_eq!(names, vec!["A".to_string()]);

    h.system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_sweep_releases_saved_cart_lines_and_deletes_empty_cart() {
    let h = harness().await;
    let mut ctx = SessionContext::new("s1", OwnerId(7));

    h.system
        .carts
        .add_line(&ctx.session_id, CartLineInput::simple(TEA, 4))
        .await
        .unwrap();
    h.system.multi_cart.save(&mut ctx, "A").await.unwrap();
    assert_eq!(levels(&h.system, TEA).await.held, 4);

    h.clock.advance(Duration::minutes(21));
    let report = h.system.sweeper.sweep_now().await.unwrap();
    assert!(report.any_removed());
    assert!(report.cart_lines.is_empty());
    assert_eq!(report.saved_lines.len(), 1);
    assert_eq!(report.saved_lines[0].0.to_string(), "user_7/A");
    assert_eq!(report.saved_lines[0].1.product_id, TEA);

    assert_eq!(levels(&h.system, TEA).await.held, 0);
    assert!(h.system.multi_cart.list(&OwnerId(7)).await.unwrap().is_empty());

    let again = h.system.sweeper.sweep_now().await.unwrap();
    assert!(!again.any_removed());

    h.system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_page_load_sweep_only_touches_its_session() {
    let h = harness().await;
    let mine = SessionContext::new("s1", OwnerId(1)).session_id;
    let theirs = SessionContext::new("s2", OwnerId(2)).session_id;

    h.system
        .carts
        .add_line(&mine, CartLineInput::simple(TEA, 2))
        .await
        .unwrap();
    h.system
        .carts
        .add_line(&theirs, CartLineInput::simple(TEA, 3))
        .await
        .unwrap();
    h.clock.advance(Duration::minutes(21));

    let removed = h.system.sweeper.sweep_session(&mine).await.unwrap();
    assert_eq!(removed.len(), 1);
    assert_eq!(levels(&h.system, TEA).await.held, 3);
    assert!(h.system.sweeper.sweep_session(&mine).await.unwrap().is_empty());

    h.system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_pre_toggle_check_flags_unsaved_lines_and_discard_releases_them() {
    let h = harness().await;
    let mut ctx = SessionContext::new("s1", OwnerId(7));

    h.system
        .carts
        .add_line(&ctx.session_id, CartLineInput::simple(TEA, 3))
        .await
        .unwrap();
    h.system.multi_cart.save(&mut ctx, "A").await.unwrap();
    h.system.multi_cart.load(&mut ctx, "A").await.unwrap();
    assert!(h.system.multi_cart.pre_toggle_check(&ctx).await.unwrap().is_empty());

    let extra = h
        .system
        .carts
        .add_line(&ctx.session_id, CartLineInput::variant(WINE, CASE_OF_6, 1))
        .await
        .unwrap();
    let unsaved = h.system.multi_cart.pre_toggle_check(&ctx).await.unwrap();
    assert_eq!(unsaved.len(), 1);
    assert_eq!(unsaved[0].key, extra.key);
    assert_eq!(levels(&h.system, WINE).await.held, 6);

    let keys: Vec<_> = unsaved.iter().map(|line| line.key.clone()).collect();
    let discarded = h.system.multi_cart.discard(&ctx, &keys).await.unwrap();
    assert_eq!(discarded.len(), 1);
    assert_eq!(levels(&h.system, WINE).await.held, 0);
    assert_eq!(levels(&h.system, TEA).await.held, 3);
    assert!(h.system.multi_cart.pre_toggle_check(&ctx).await.unwrap().is_empty());

    h.system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_update_in_place_merges_into_loaded_cart() {
    let h = harness().await;
    let mut ctx = SessionContext::new("s1", OwnerId(7));

    let tea = h
        .system
        .carts
        .add_line(&ctx.session_id, CartLineInput::simple(TEA, 3))
        .await
        .unwrap();
    h.system.multi_cart.save(&mut ctx, "A").await.unwrap();

    let err = h.system.multi_cart.update_in_place(&ctx, "A").await.unwrap_err();
    assert_eq!(err, MultiCartError::NotLoaded("A".to_string()));

    h.system.multi_cart.load(&mut ctx, "A").await.unwrap();
    h.system
        .carts
        .change_quantity(&ctx.session_id, &tea.key, 5)
        .await
        .unwrap();
    h.system
        .carts
        .add_line(&ctx.session_id, CartLineInput::variant(WINE, CASE_OF_6, 1))
        .await
        .unwrap();

    let updated = h.system.multi_cart.update_in_place(&ctx, "A").await.unwrap();
    assert_eq!(updated.lines.len(), 2);
    let saved_tea = updated
        .lines
        .iter()
        .find(|line| line.key == tea.key)
        .expect("Tea line missing");
    assert_eq!(saved_tea.quantity, 5);
    assert!(updated.lines.iter().any(|line| line.product_id == WINE));

    // Shared claims: the stock is held once.
    assert_eq!(levels(&h.system, TEA).await.held, 5);
    assert_eq!(levels(&h.system, WINE).await.held, 6);
    assert!(h.system.multi_cart.pre_toggle_check(&ctx).await.unwrap().is_empty());

    let err = h.system.multi_cart.update_in_place(&ctx, "B").await.unwrap_err();
    assert_eq!(err, MultiCartError::NotLoaded("B".to_string()));

    h.system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_removing_last_saved_line_deletes_saved_cart() {
    let h = harness().await;
    let mut ctx = SessionContext::new("s1", OwnerId(7));

    h.system
        .carts
        .add_line(&ctx.session_id, CartLineInput::simple(TEA, 2))
        .await
        .unwrap();
    h.system
        .carts
        .add_line(&ctx.session_id, CartLineInput::variant(WINE, CASE_OF_6, 1))
        .await
        .unwrap();
    h.system.multi_cart.save(&mut ctx, "A").await.unwrap();

    let removed = h
        .system
        .multi_cart
        .remove_saved_line(&ctx, "A", &TEA, None)
        .await
        .unwrap();
    assert!(removed.is_some());
    assert_eq!(levels(&h.system, TEA).await.held, 0);
    assert_eq!(h.system.multi_cart.list(&OwnerId(7)).await.unwrap().len(), 1);

    let missing = h
        .system
        .multi_cart
        .remove_saved_line(&ctx, "A", &TEA, None)
        .await
        .unwrap();
    assert!(missing.is_none());

    h.system
        .multi_cart
        .remove_saved_line(&ctx, "A", &WINE, Some(&CASE_OF_6))
        .await
        .unwrap();
    assert_eq!(levels(&h.system, WINE).await.held, 0);
    assert!(h.system.multi_cart.list(&OwnerId(7)).await.unwrap().is_empty());

    h.system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_raw_ledger_adjustments_clamp_at_zero() {
    let h = harness().await;

    assert_eq!(h.system.ledger.get_available(&WINE).await.unwrap(), 50);
    assert_eq!(h.system.ledger.adjust_held(&WINE, 8).await.unwrap(), 8);
    assert_eq!(h.system.ledger.adjust_reserved(&WINE, 12).await.unwrap(), 12);
    assert_eq!(h.system.ledger.get_available(&WINE).await.unwrap(), 30);
    assert_eq!(levels(&h.system, WINE).await.display, 38);

    assert_eq!(h.system.ledger.adjust_held(&WINE, -100).await.unwrap(), 0);
    assert_eq!(h.system.ledger.adjust_reserved(&WINE, -12).await.unwrap(), 0);
    assert_eq!(h.system.ledger.get_available(&WINE).await.unwrap(), 50);

    // A product nobody has seen yet starts empty.
    assert_eq!(h.system.ledger.get_available(&ProductId(99)).await.unwrap(), 0);

    h.system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_countdown_feed_reports_time_left() {
    let h = harness().await;
    let session = SessionContext::new("s1", OwnerId(1)).session_id;
    let line = h
        .system
        .carts
        .add_line(&session, CartLineInput::simple(TEA, 1))
        .await
        .unwrap();
    h.clock.advance(Duration::minutes(5));

    let mut feed = h.system.watch_countdowns(session.clone());
    let first = tokio::time::timeout(std::time::Duration::from_secs(2), feed.recv())
        .await
        .expect("No countdown within the interval")
        .expect("Feed closed");
    assert_eq!(first, vec![(line.key.clone(), Duration::minutes(15))]);

    h.system.shutdown().await.unwrap();
    // The feed stops with the system.
    let closed = tokio::time::timeout(std::time::Duration::from_secs(2), async {
        while feed.recv().await.is_some() {}
    })
    .await;
    assert!(closed.is_ok());
}

#[tokio::test]
async fn test_deleting_loaded_cart_empties_active_cart() {
    let h = harness().await;
    let mut ctx = SessionContext::new("s1", OwnerId(7));

    h.system
        .carts
        .add_line(&ctx.session_id, CartLineInput::simple(TEA, 3))
        .await
        .unwrap();
    h.system.multi_cart.save(&mut ctx, "A").await.unwrap();
    h.system.multi_cart.load(&mut ctx, "A").await.unwrap();
    h.system
        .carts
        .add_line(&ctx.session_id, CartLineInput::simple(WINE, 2))
        .await
        .unwrap();

    h.system.multi_cart.delete(&mut ctx, "A").await.unwrap();
    assert_eq!(ctx.loaded_cart_name, None);
    assert!(h.system.carts.lines(&ctx.session_id).await.unwrap().is_empty());
    assert_eq!(levels(&h.system, TEA).await.held, 0);
    assert_eq!(levels(&h.system, WINE).await.held, 0);

    h.system.shutdown().await.unwrap();
}
