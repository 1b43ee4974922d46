//! In-process stand-in for the inventory system.
//!
//! Keeps sellable quantities per SKU and the orders it was sent. Advancing an order to an
//! allocated state deducts its units from the sellable quantity once, which is what the real
//! system does when it takes over a reservation.

use super::{ExternalOrder, ExternalOrderRequest, GatewayError, InventoryGateway};
use crate::model::{ExternalStatus, Sku};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct StoredOrder {
    pub request: ExternalOrderRequest,
    pub status: ExternalStatus,
    allocated: bool,
}

#[derive(Debug, Default)]
struct State {
    sellable: HashMap<Sku, u32>,
    orders: HashMap<String, StoredOrder>,
    failing: bool,
    next_id: u64,
}

#[derive(Debug, Default)]
pub struct InMemoryGateway {
    state: Mutex<State>,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_sellable(&self, sku: impl Into<String>, quantity: u32) {
        self.state().sellable.insert(Sku(sku.into()), quantity);
    }

    /// While failing, every call returns [`GatewayError::Unavailable`].
    pub fn set_failing(&self, failing: bool) {
        self.state().failing = failing;
    }

    pub fn order(&self, external_id: &str) -> Option<StoredOrder> {
        self.state().orders.get(external_id).cloned()
    }

    pub fn order_count(&self) -> usize {
        self.state().orders.len()
    }

    /// Moves an order to `status` as the warehouse would. Returns `None` for unknown ids.
    pub fn advance_order(&self, external_id: &str, status: ExternalStatus) -> Option<ExternalOrder> {
        let mut state = self.state();
        let State {
            sellable, orders, ..
        } = &mut *state;
        let order = orders.get_mut(external_id)?;
        if status.is_advanced() && !order.allocated {
            for item in &order.request.line_items {
                let entry = sellable.entry(item.sku.clone()).or_insert(0);
                *entry = entry.saturating_sub(item.quantity);
            }
            order.allocated = true;
        }
        order.status = status.clone();
        debug!(external_id, %status, "Order advanced");
        Some(ExternalOrder {
            id: external_id.to_string(),
            status,
        })
    }

    fn check(&self) -> Result<(), GatewayError> {
        if self.state().failing {
            return Err(GatewayError::Unavailable);
        }
        Ok(())
    }
}

#[async_trait]
impl InventoryGateway for InMemoryGateway {
    async fn sellable_quantity(&self, sku: &Sku) -> Result<u32, GatewayError> {
        self.check()?;
        self.state()
            .sellable
            .get(sku)
            .copied()
            .ok_or_else(|| GatewayError::UnknownSku(sku.clone()))
    }

    async fn create_order(&self, request: &ExternalOrderRequest) -> Result<ExternalOrder, GatewayError> {
        self.check()?;
        let mut state = self.state();
        state.next_id += 1;
        let id = format!("ext_{}", state.next_id);
        state.orders.insert(
            id.clone(),
            StoredOrder {
                request: request.clone(),
                status: request.status.clone(),
                allocated: false,
            },
        );
        Ok(ExternalOrder {
            id,
            status: request.status.clone(),
        })
    }

    async fn update_order(
        &self,
        external_id: &str,
        request: &ExternalOrderRequest,
    ) -> Result<ExternalOrder, GatewayError> {
        self.check()?;
        let mut state = self.state();
        let Some(order) = state.orders.get_mut(external_id) else {
            return Err(GatewayError::ApiError {
                status: 404,
                message: format!("order {external_id} not found"),
            });
        };
        order.request = request.clone();
        order.status = request.status.clone();
        Ok(ExternalOrder {
            id: external_id.to_string(),
            status: order.status.clone(),
        })
    }
}
