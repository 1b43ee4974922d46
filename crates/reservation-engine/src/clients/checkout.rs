//! # Checkout
//!
//! Converts a session's active cart into a placed order. Taking the lines out of the cart and
//! handing their claims to the order are separate actor messages, but a taken line can no
//! longer be swept, and a failed order puts the lines back.
use crate::cart_actor::CartError;
use crate::clients::{CartClient, MultiCartStore, OrderClient, SessionContext};
use crate::model::{CartLine, Catalog, Destination, Order, OrderCreate, OrderId, OrderLineInput, OrderStatus};
use crate::order_actor::OrderError;
use actor_framework::ActorClient;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, instrument, warn};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CheckoutError {
    /// Required destination fields are blank.
    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    #[error("Cannot check out an empty cart")]
    EmptyCart,

    #[error(transparent)]
    Cart(#[from] CartError),

    #[error(transparent)]
    Order(#[from] OrderError),
}

#[derive(Clone)]
pub struct CheckoutService {
    carts: CartClient,
    orders: OrderClient,
    multi_cart: MultiCartStore,
    catalog: Arc<Catalog>,
}

impl CheckoutService {
    pub fn new(
        carts: CartClient,
        orders: OrderClient,
        multi_cart: MultiCartStore,
        catalog: Arc<Catalog>,
    ) -> Self {
        Self {
            carts,
            orders,
            multi_cart,
            catalog,
        }
    }

    /// Places `order_id` from the session's active cart.
    ///
    /// Held lines become reservations under the order; backorder lines are carried without
    /// touching the ledger. A loaded saved cart is destroyed once the order exists. Checking
    /// out an id that is already placed returns that order without touching the cart.
    #[instrument(skip(self, destination))]
    pub async fn checkout(
        &self,
        ctx: &mut SessionContext,
        order_id: OrderId,
        destination: Destination,
    ) -> Result<Order, CheckoutError> {
        let missing = destination.missing_fields();
        if !missing.is_empty() {
            return Err(CheckoutError::MissingFields(missing));
        }

        // A repeated checkout returns the placed order and leaves the cart alone.
        if let Some(order) = self.orders.get(order_id.clone()).await? {
            info!(%order_id, "Order already placed");
            return Ok(order);
        }

        let lines = self.carts.take_lines(&ctx.session_id).await?;
        if lines.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let params = OrderCreate {
            lines: lines.iter().map(|line| self.order_line(line)).collect(),
            destination,
            status: OrderStatus::Processing,
        };
        if let Err(e) = self.orders.create_order(order_id.clone(), params).await {
            warn!(%order_id, error = %e, "Order placement failed, restoring cart");
            self.carts.restore_lines(&ctx.session_id, lines).await?;
            return match e {
                // Lost a race with another checkout of the same id.
                OrderError::AlreadyPlaced(_) => self.placed(order_id).await,
                other => Err(other.into()),
            };
        }

        if let Err(e) = self.multi_cart.complete_order_for_loaded_cart(ctx).await {
            warn!(%order_id, error = %e, "Loaded cart could not be cleared");
        }

        info!(%order_id, session_id = %ctx.session_id, "Checkout complete");
        self.placed(order_id).await
    }

    async fn placed(&self, order_id: OrderId) -> Result<Order, CheckoutError> {
        self.orders
            .get(order_id.clone())
            .await?
            .ok_or_else(|| OrderError::NotFound(order_id.to_string()).into())
    }

    fn order_line(&self, line: &CartLine) -> OrderLineInput {
        let entry = self.catalog.entry(&line.product_id);
        OrderLineInput {
            product_id: line.product_id.clone(),
            variant_id: line.variant_id.clone(),
            sku: entry.as_ref().map(|entry| entry.sku.clone()),
            quantity: line.quantity,
            pack_size: line.pack_size,
            unit_price: entry.as_ref().map_or(0.0, |entry| entry.unit_price),
            discount_price: None,
            hold_claim: line.held.then_some(line.claim),
            backorder: !line.held,
        }
    }
}
