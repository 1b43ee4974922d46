//! Order Sync Coordinator.
//!
//! Failures are never retried here. The order keeps its previous state, gains a note, and the
//! operator is told; [`OrderSyncCoordinator::resync`] is the recovery path.

use super::OperatorNotifier;
use crate::clients::{LedgerClient, OrderClient};
use crate::gateway::{ExternalOrder, ExternalOrderRequest, GatewayError, InventoryGateway};
use crate::ledger_actor::LedgerError;
use crate::model::{Catalog, ExternalStatus, Order, OrderId, OrderStatus, ProductId, StockLevels};
use crate::order_actor::OrderError;
use actor_framework::ActorClient;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SyncError {
    #[error(transparent)]
    Order(#[from] OrderError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// What a cancellation request actually did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CancelOutcome {
    /// The order's reservations were released by this call.
    pub released: bool,
    /// The cancellation was sent to the inventory system.
    pub external_cancelled: bool,
}

#[derive(Clone)]
pub struct OrderSyncCoordinator {
    orders: OrderClient,
    ledger: LedgerClient,
    catalog: Arc<Catalog>,
    gateway: Arc<dyn InventoryGateway>,
    notifier: Arc<dyn OperatorNotifier>,
}

impl OrderSyncCoordinator {
    pub fn new(
        orders: OrderClient,
        ledger: LedgerClient,
        catalog: Arc<Catalog>,
        gateway: Arc<dyn InventoryGateway>,
        notifier: Arc<dyn OperatorNotifier>,
    ) -> Self {
        Self {
            orders,
            ledger,
            catalog,
            gateway,
            notifier,
        }
    }

    async fn load(&self, order_id: &OrderId) -> Result<Order, SyncError> {
        self.orders
            .get(order_id.clone())
            .await?
            .ok_or_else(|| OrderError::NotFound(order_id.to_string()).into())
    }

    /// Creates the external order, or updates it once an external id is stored, then records
    /// the returned id and status and refreshes every product on the order.
    #[instrument(skip(self))]
    pub async fn create_or_update_external_order(
        &self,
        order_id: &OrderId,
    ) -> Result<ExternalOrder, SyncError> {
        let order = self.load(order_id).await?;
        let status = match order.status {
            OrderStatus::Cancelled => ExternalStatus::Cancelled,
            _ => ExternalStatus::Created,
        };
        let request = ExternalOrderRequest::from_order(&order, status);

        let result = match &order.external_id {
            None => self.gateway.create_order(&request).await,
            Some(external_id) => self.gateway.update_order(external_id, &request).await,
        };
        let external = match result {
            Ok(external) => external,
            Err(e) => {
                self.report_failure(order_id, "sync", &e).await;
                return Err(e.into());
            }
        };

        self.orders
            .record_sync(order_id, external.id.clone(), external.status.clone())
            .await?;
        info!(%order_id, external_id = %external.id, status = %external.status, "Order synced");
        self.refresh_products(&order.products()).await?;
        Ok(external)
    }

    /// Manual re-sync after a failure.
    pub async fn resync(&self, order_id: &OrderId) -> Result<ExternalOrder, SyncError> {
        self.create_or_update_external_order(order_id).await
    }

    /// Cancels an order locally and, while the inventory system still reports it as created,
    /// externally too.
    ///
    /// Once the external order has advanced, only the local order is cancelled and a note
    /// records that the inventory system was left alone. If sending the cancellation fails,
    /// nothing changes locally.
    #[instrument(skip(self))]
    pub async fn cancel_order(
        &self,
        order_id: &OrderId,
        reason: Option<String>,
    ) -> Result<CancelOutcome, SyncError> {
        let order = self.load(order_id).await?;
        let eligible = matches!(order.external_status, None | Some(ExternalStatus::Created));

        let mut external_cancelled = false;
        if eligible {
            if let Some(external_id) = &order.external_id {
                let request = ExternalOrderRequest::from_order(&order, ExternalStatus::Cancelled);
                match self.gateway.update_order(external_id, &request).await {
                    Ok(external) => {
                        self.orders
                            .record_sync(order_id, external.id, external.status)
                            .await?;
                        external_cancelled = true;
                    }
                    Err(e) => {
                        self.report_failure(order_id, "cancellation", &e).await;
                        return Err(e.into());
                    }
                }
            }
        } else if let Some(status) = order
            .external_status
            .as_ref()
            .filter(|status| **status != ExternalStatus::Cancelled)
        {
            warn!(%order_id, %status, "External order has advanced, cancelling locally only");
            self.orders
                .add_note(
                    order_id,
                    format!("Inventory system reports {status}; the external order was not cancelled"),
                )
                .await?;
        }

        let released = self.orders.cancel(order_id, reason).await?;
        if released || external_cancelled {
            self.refresh_products(&order.products()).await?;
        }
        Ok(CancelOutcome {
            released,
            external_cancelled,
        })
    }

    /// Applies a status pushed or polled from the inventory system to the local order.
    ///
    /// Returns the local order id, or `None` when no order carries `external_id`.
    #[instrument(skip(self))]
    pub async fn handle_external_status(
        &self,
        external_id: &str,
        status: ExternalStatus,
    ) -> Result<Option<OrderId>, SyncError> {
        let Some(order) = self.orders.find_by_external_id(external_id).await? else {
            warn!(external_id, %status, "No local order for external id");
            return Ok(None);
        };
        let affected = self.orders.observe_external_status(&order.id, status).await?;
        if !affected.is_empty() {
            self.refresh_products(&affected).await?;
        }
        Ok(Some(order.id))
    }

    /// Pulls the sellable quantity of each product and stores it on the ledger.
    ///
    /// A product whose fetch fails keeps its last known quantity and is left out of the result.
    #[instrument(skip(self))]
    pub async fn refresh_products(
        &self,
        products: &[ProductId],
    ) -> Result<Vec<(ProductId, StockLevels)>, SyncError> {
        let mut refreshed = Vec::with_capacity(products.len());
        for product_id in products {
            let Some(entry) = self.catalog.entry(product_id) else {
                debug!(%product_id, "Product has no SKU, not refreshed");
                continue;
            };
            let sellable = match self.gateway.sellable_quantity(&entry.sku).await {
                Ok(sellable) => sellable,
                Err(e) => {
                    warn!(%product_id, sku = %entry.sku, error = %e, "Sellable quantity unavailable, keeping last known value");
                    continue;
                }
            };
            let levels = self.ledger.refresh_external(product_id, sellable).await?;
            info!(%product_id, sellable, display = levels.display, available = levels.available, "Stock refreshed");
            refreshed.push((product_id.clone(), levels));
        }
        Ok(refreshed)
    }

    async fn report_failure(&self, order_id: &OrderId, operation: &str, e: &GatewayError) {
        error!(%order_id, operation, error = %e, "Inventory sync failed");
        let message = format!("Inventory {operation} failed: {e}");
        if let Err(note_error) = self.orders.add_note(order_id, message.clone()).await {
            warn!(%order_id, error = %note_error, "Could not attach failure note");
        }
        self.notifier
            .notify(&format!("Order {order_id} could not be synced"), &message)
            .await;
    }
}
