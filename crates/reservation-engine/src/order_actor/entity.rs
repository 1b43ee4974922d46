//! [`ActorEntity`] implementation for [`Order`].
//!
//! Reservations are released or destroyed at most once per order: `stock_adjusted` is the
//! fast path, and the ledger's per-claim bookkeeping makes any repeat a no-op anyway.

use super::actions::{OrderAction, OrderActionResult};
use super::error::OrderError;
use super::OrderContext;
use crate::model::{
    ClaimId, ExternalStatus, Order, OrderCreate, OrderId, OrderLine, OrderNote, OrderStatus,
    OrderUpdate, ProductId,
};
use actor_framework::ActorEntity;
use async_trait::async_trait;
use tracing::{debug, info, warn};

#[async_trait]
impl ActorEntity for Order {
    type Id = OrderId;
    type Create = OrderCreate;
    type Update = OrderUpdate;
    type Action = OrderAction;
    type ActionResult = OrderActionResult;
    type Context = OrderContext;
    type Error = OrderError;

    fn from_create_params(id: OrderId, params: OrderCreate) -> Result<Self, Self::Error> {
        if params.lines.is_empty() {
            return Err(OrderError::EmptyOrder);
        }
        let mut lines = Vec::with_capacity(params.lines.len());
        for (index, input) in params.lines.into_iter().enumerate() {
            let line_id = u32::try_from(index + 1).unwrap_or(u32::MAX);
            if input.quantity == 0 {
                return Err(OrderError::InvalidQuantity { line_id });
            }
            let pack_size = input.pack_size.max(1);
            lines.push(OrderLine {
                line_id,
                reservation_claim: ClaimId::for_order_line(&id, line_id),
                reserved_qty: input.quantity.saturating_mul(pack_size),
                product_id: input.product_id,
                variant_id: input.variant_id,
                sku: input.sku,
                quantity: input.quantity,
                pack_size,
                unit_price: input.unit_price,
                discount_price: input.discount_price,
                hold_claim: input.hold_claim,
                backorder: input.backorder,
            });
        }
        Ok(Self {
            id,
            lines,
            destination: params.destination,
            status: params.status,
            external_id: None,
            external_status: None,
            stock_adjusted: false,
            notes: Vec::new(),
        })
    }

    /// Converts each line's cart hold into a reservation.
    ///
    /// On failure the lines already converted are put back as holds, so the caller can return
    /// them to the cart unchanged.
    async fn on_create(&mut self, ctx: &OrderContext) -> Result<(), Self::Error> {
        let mut converted: Vec<&OrderLine> = Vec::new();
        for line in self.lines.iter().filter(|line| !line.backorder) {
            let result = ctx
                .ledger
                .transfer_hold(
                    &line.product_id,
                    line.hold_claim,
                    line.reservation_claim,
                    line.reserved_qty,
                )
                .await;
            match result {
                Ok(true) => converted.push(line),
                Ok(false) => debug!(order_id = %self.id, line_id = line.line_id, "Line already reserved"),
                Err(e) => {
                    warn!(order_id = %self.id, line_id = line.line_id, error = %e, "Reservation failed, rolling back");
                    for done in converted {
                        undo_conversion(done, ctx).await;
                    }
                    return Err(e.into());
                }
            }
        }
        info!(
            order_id = %self.id,
            lines = self.lines.len(),
            reserved = ?self.reserved_products(),
            "Order placed"
        );
        Ok(())
    }

    async fn on_update(&mut self, update: OrderUpdate, _ctx: &OrderContext) -> Result<(), Self::Error> {
        if let Some(to) = update.status {
            if self.status == OrderStatus::Cancelled || to == OrderStatus::Cancelled {
                return Err(OrderError::InvalidTransition {
                    from: self.status,
                    to,
                });
            }
            self.status = to;
        }
        if let Some(destination) = update.destination {
            self.destination = destination;
        }
        Ok(())
    }

    async fn handle_action(
        &mut self,
        action: OrderAction,
        ctx: &OrderContext,
    ) -> Result<OrderActionResult, Self::Error> {
        match action {
            OrderAction::Cancel { reason } => {
                self.cancel(reason, ctx).await.map(OrderActionResult::Cancel)
            }
            OrderAction::ObserveExternalStatus(status) => self
                .observe_external_status(status, ctx)
                .await
                .map(OrderActionResult::ObserveExternalStatus),
            OrderAction::RecordSync {
                external_id,
                external_status,
            } => {
                info!(order_id = %self.id, %external_id, %external_status, "External order recorded");
                self.external_id = Some(external_id);
                self.external_status = Some(external_status);
                Ok(OrderActionResult::RecordSync(self.clone()))
            }
            OrderAction::AddNote(message) => {
                self.note(message, ctx);
                Ok(OrderActionResult::AddNote(self.clone()))
            }
        }
    }
}

async fn undo_conversion(line: &OrderLine, ctx: &OrderContext) {
    let restored = async {
        ctx.ledger
            .set_reservation(&line.product_id, line.reservation_claim, 0)
            .await?;
        if let Some(hold) = line.hold_claim {
            ctx.ledger
                .set_hold(&line.product_id, hold, line.reserved_qty)
                .await?;
        }
        Ok::<_, crate::ledger_actor::LedgerError>(())
    }
    .await;
    if let Err(e) = restored {
        warn!(product_id = %line.product_id, line_id = line.line_id, error = %e, "Rollback failed");
    }
}

impl Order {
    fn note(&mut self, message: impl Into<String>, ctx: &OrderContext) {
        let message = message.into();
        debug!(order_id = %self.id, %message, "Order note");
        self.notes.push(OrderNote {
            at: ctx.clock.now(),
            message,
        });
    }

    /// Drops every reservation this order holds. Returns the affected products.
    async fn release_reservations(&mut self, ctx: &OrderContext) -> Result<Vec<ProductId>, OrderError> {
        for line in self.lines.iter().filter(|line| !line.backorder) {
            ctx.ledger
                .set_reservation(&line.product_id, line.reservation_claim, 0)
                .await?;
        }
        self.stock_adjusted = true;
        Ok(self.reserved_products())
    }

    async fn cancel(&mut self, reason: Option<String>, ctx: &OrderContext) -> Result<bool, OrderError> {
        if self.stock_adjusted {
            if self.status != OrderStatus::Cancelled {
                self.status = OrderStatus::Cancelled;
                self.note("Order cancelled; stock had already been adjusted", ctx);
            }
            debug!(order_id = %self.id, "Stock already adjusted, cancellation is a no-op");
            return Ok(false);
        }

        let products = self.release_reservations(ctx).await?;
        self.status = OrderStatus::Cancelled;
        let message = match reason {
            Some(reason) => format!("Order cancelled: {reason}"),
            None => "Order cancelled".to_string(),
        };
        self.note(message, ctx);
        info!(order_id = %self.id, products = ?products, "Order cancelled, reservations released");
        Ok(true)
    }

    async fn observe_external_status(
        &mut self,
        status: ExternalStatus,
        ctx: &OrderContext,
    ) -> Result<Vec<ProductId>, OrderError> {
        if self.external_status.as_ref() == Some(&status) {
            debug!(order_id = %self.id, %status, "External status unchanged");
            return Ok(Vec::new());
        }
        info!(order_id = %self.id, %status, previous = ?self.external_status, "External status observed");
        self.external_status = Some(status.clone());

        let mut affected = Vec::new();
        match &status {
            ExternalStatus::Created => {}
            ExternalStatus::Cancelled => {
                if !self.stock_adjusted {
                    affected = self.release_reservations(ctx).await?;
                }
                if self.status != OrderStatus::Cancelled {
                    self.status = OrderStatus::Cancelled;
                    self.note("Order cancelled by the inventory system", ctx);
                }
            }
            advanced if advanced.is_advanced() => {
                if !self.stock_adjusted {
                    // The external system now accounts for these units itself.
                    affected = self.release_reservations(ctx).await?;
                }
                let next = match advanced {
                    ExternalStatus::Shipped | ExternalStatus::Delivered => OrderStatus::Fulfilled,
                    _ => OrderStatus::Processing,
                };
                if self.status != OrderStatus::Cancelled && self.status != next {
                    self.status = next;
                    self.note(format!("Inventory system reports {advanced}"), ctx);
                }
            }
            other => {
                self.note(format!("Unrecognised external status: {other}"), ctx);
            }
        }
        Ok(affected)
    }
}
