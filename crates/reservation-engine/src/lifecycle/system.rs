use super::{ReservationClock, Sweeper};
use crate::cart_actor::{self, CartContext, CartError};
use crate::clients::{
    CartClient, CheckoutService, LedgerClient, MultiCartStore, OrderClient, SavedCartClient,
};
use crate::clock::{self, Clock};
use crate::config::{ConfigError, EngineConfig};
use crate::gateway::InventoryGateway;
use crate::ledger_actor;
use crate::model::{CartItemKey, Catalog, SessionId};
use crate::order_actor::{self, OrderContext};
use crate::saved_cart_actor::{self, SavedCartContext};
use crate::sync::{OperatorNotifier, OrderSyncCoordinator, WebhookHandler};
use chrono::Duration;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// Time left on each line of a cart, as shown next to the line.
pub type Countdowns = Vec<(CartItemKey, Duration)>;

/// The runtime orchestrator for the reservation engine.
///
/// `ReservationSystem` is responsible for:
/// - **Lifecycle Management**: starting and stopping every actor and the reservation clock
/// - **Dependency Wiring**: the cart, saved cart and order actors all get the ledger client
///   as context
///
/// # Example
///
/// ```ignore
/// let mut system = ReservationSystem::new(config, catalog, gateway, notifier, clock)?;
/// system.start_clock();
///
/// system.carts.add_line(&session, CartLineInput::simple(ProductId(1), 3)).await?;
/// system.checkout.checkout(&mut ctx, order_id, destination).await?;
///
/// system.shutdown().await?;
/// ```
pub struct ReservationSystem {
    pub config: EngineConfig,
    pub catalog: Arc<Catalog>,
    pub clock: Arc<dyn Clock>,
    pub ledger: LedgerClient,
    pub carts: CartClient,
    pub saved_carts: SavedCartClient,
    pub orders: OrderClient,
    pub multi_cart: MultiCartStore,
    pub checkout: CheckoutService,
    pub sync: OrderSyncCoordinator,
    pub webhooks: WebhookHandler,
    pub sweeper: Sweeper,
    reservation_clock: Option<ReservationClock>,
    /// Tells countdown feeds to stop so their cart clients are dropped on shutdown.
    stopping: watch::Sender<bool>,
    /// Task handles for all running actors (used for graceful shutdown)
    handles: Vec<JoinHandle<()>>,
}

impl ReservationSystem {
    /// Validates `config`, spawns every actor and wires the services on top.
    ///
    /// The reservation clock is not started; call [`start_clock`](Self::start_clock).
    pub fn new(
        config: EngineConfig,
        catalog: Arc<Catalog>,
        gateway: Arc<dyn InventoryGateway>,
        notifier: Arc<dyn OperatorNotifier>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let mailbox = config.actors.mailbox_size;

        // 1. Create actors (no dependencies)
        let (ledger, mut handles) = ledger_actor::spawn_sharded(config.actors.ledger_shards, mailbox);
        let (cart_actor, cart_client) = cart_actor::new(mailbox);
        let (saved_actor, saved_client) = saved_cart_actor::new(mailbox);
        let (order_actor, order_client) = order_actor::new(mailbox);

        // 2. Start actors with injected context
        handles.push(tokio::spawn(cart_actor.run(CartContext {
            ledger: ledger.clone(),
            catalog: catalog.clone(),
            clock: clock.clone(),
            window: config.reservation_window(),
        })));
        handles.push(tokio::spawn(saved_actor.run(SavedCartContext {
            ledger: ledger.clone(),
        })));
        handles.push(tokio::spawn(order_actor.run(OrderContext {
            ledger: ledger.clone(),
            clock: clock.clone(),
        })));

        // 3. Services over the clients
        let carts = CartClient::new(cart_client);
        let saved_carts = SavedCartClient::new(saved_client);
        let orders = OrderClient::new(order_client);
        let multi_cart =
            MultiCartStore::new(carts.clone(), saved_carts.clone(), ledger.clone(), clock.clone());
        let checkout = CheckoutService::new(
            carts.clone(),
            orders.clone(),
            multi_cart.clone(),
            catalog.clone(),
        );
        let sync = OrderSyncCoordinator::new(
            orders.clone(),
            ledger.clone(),
            catalog.clone(),
            gateway,
            notifier,
        );
        let webhooks = WebhookHandler::new(
            config.webhook_secret.clone(),
            catalog.clone(),
            ledger.clone(),
            sync.clone(),
        );
        let sweeper = Sweeper::new(carts.clone(), saved_carts.clone(), clock.clone());

        info!(
            shards = ledger.shard_count(),
            window_minutes = config.reservation.window_minutes,
            "Reservation system started"
        );
        Ok(Self {
            config,
            catalog,
            clock,
            ledger,
            carts,
            saved_carts,
            orders,
            multi_cart,
            checkout,
            sync,
            webhooks,
            sweeper,
            reservation_clock: None,
            stopping: watch::channel(false).0,
            handles,
        })
    }

    /// Starts the background sweep at the configured interval. A second call is a no-op.
    pub fn start_clock(&mut self) {
        if self.reservation_clock.is_none() {
            self.reservation_clock = Some(ReservationClock::spawn(
                self.sweeper.clone(),
                self.config.sweep_interval(),
            ));
        }
    }

    /// Cosmetic time left on each line of a session's cart.
    pub async fn countdowns(&self, session_id: &SessionId) -> Result<Countdowns, CartError> {
        countdowns(&self.carts, self.clock.as_ref(), session_id).await
    }

    /// Pushes a session's countdowns at the configured countdown interval.
    ///
    /// Purely cosmetic: nothing is released here. The feed ends when the receiver is dropped
    /// or the system shuts down. A refresh the receiver has not taken yet is skipped.
    pub fn watch_countdowns(&self, session_id: SessionId) -> mpsc::Receiver<Countdowns> {
        let (tx, rx) = mpsc::channel(1);
        let carts = self.carts.clone();
        let clock = self.clock.clone();
        let period = self.config.countdown_interval().max(std::time::Duration::from_millis(1));
        let mut stopping = self.stopping.subscribe();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = stopping.changed() => break,
                    _ = tx.closed() => break,
                    _ = ticker.tick() => {
                        let refresh = match countdowns(&carts, clock.as_ref(), &session_id).await {
                            Ok(refresh) => refresh,
                            Err(e) => {
                                warn!(%session_id, error = %e, "Countdown refresh failed");
                                continue;
                            }
                        };
                        if let Err(mpsc::error::TrySendError::Closed(_)) = tx.try_send(refresh) {
                            break;
                        }
                    }
                }
            }
            debug!(%session_id, "Countdown feed stopped");
        });
        rx
    }

    /// Gracefully shuts down the entire system.
    ///
    /// Stops the reservation clock, drops every client so each actor's channel closes, then
    /// waits for all actor tasks. Returns an error if any actor task panicked.
    pub async fn shutdown(self) -> Result<(), String> {
        info!("Shutting down reservation system...");
        let Self {
            reservation_clock,
            stopping,
            handles,
            ledger,
            carts,
            saved_carts,
            orders,
            multi_cart,
            checkout,
            sync,
            webhooks,
            sweeper,
            ..
        } = self;

        if let Some(reservation_clock) = reservation_clock {
            reservation_clock.stop().await;
        }
        let _ = stopping.send(true);
        drop((
            ledger,
            carts,
            saved_carts,
            orders,
            multi_cart,
            checkout,
            sync,
            webhooks,
            sweeper,
        ));

        for handle in handles {
            if let Err(e) = handle.await {
                error!("Actor task failed: {:?}", e);
                return Err(format!("Actor task failed: {:?}", e));
            }
        }

        info!("System shutdown complete.");
        Ok(())
    }
}

async fn countdowns(
    carts: &CartClient,
    time: &dyn Clock,
    session_id: &SessionId,
) -> Result<Countdowns, CartError> {
    let now = time.now();
    Ok(carts
        .lines(session_id)
        .await?
        .into_iter()
        .map(|line| (line.key, clock::countdown(line.expires_at, now)))
        .collect())
}
