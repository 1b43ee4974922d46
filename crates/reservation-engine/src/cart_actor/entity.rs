//! [`ActorEntity`] implementation for [`Cart`]: the cart reservation controller.
//!
//! Ledger calls happen before the cart itself is mutated, so a failed call leaves the cart
//! as it was. Holds are addressed by claim, which makes every release idempotent.

use super::actions::{CartAction, CartActionResult, Replaced};
use super::error::CartError;
use super::CartContext;
use crate::ledger_actor::LedgerError;
use crate::model::{Cart, CartItemKey, CartLine, CartLineInput, ClaimId, ProductId, SessionId};
use actor_framework::ActorEntity;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use tracing::{debug, info, warn};

#[async_trait]
impl ActorEntity for Cart {
    type Id = SessionId;
    type Create = ();
    type Update = ();
    type Action = CartAction;
    type ActionResult = CartActionResult;
    type Context = CartContext;
    type Error = CartError;

    fn from_create_params(id: SessionId, _params: ()) -> Result<Self, Self::Error> {
        Ok(Cart::new(id))
    }

    fn implicit(id: &SessionId) -> Option<Self> {
        Some(Cart::new(id.clone()))
    }

    fn is_retired(&self) -> bool {
        self.lines.is_empty()
    }

    async fn on_update(&mut self, _update: (), _ctx: &CartContext) -> Result<(), Self::Error> {
        Ok(())
    }

    async fn handle_action(
        &mut self,
        action: CartAction,
        ctx: &CartContext,
    ) -> Result<CartActionResult, Self::Error> {
        match action {
            CartAction::AddLine(input) => self.add_line(input, ctx).await.map(CartActionResult::AddLine),
            CartAction::ChangeQuantity { key, quantity } => self
                .change_quantity(&key, quantity, ctx)
                .await
                .map(CartActionResult::ChangeQuantity),
            CartAction::RemoveLine { key, product_id } => self
                .remove_line(&key, product_id.as_ref(), ctx)
                .await
                .map(CartActionResult::RemoveLine),
            CartAction::SweepExpired { now } => self
                .sweep_expired(now, ctx)
                .await
                .map(CartActionResult::SweepExpired),
            CartAction::Empty => self.empty(ctx).await.map(CartActionResult::Empty),
            CartAction::ReplaceLines { lines, keep } => self
                .replace_lines(lines, &keep, ctx)
                .await
                .map(CartActionResult::ReplaceLines),
            CartAction::RestoreLines(lines) => self
                .restore_lines(lines, ctx)
                .await
                .map(CartActionResult::RestoreLines),
            CartAction::TakeLines => {
                let taken = std::mem::take(&mut self.lines);
                info!(session_id = %self.session_id, lines = taken.len(), "Lines taken");
                Ok(CartActionResult::TakeLines(taken))
            }
        }
    }
}

async fn release(line: &CartLine, ctx: &CartContext) -> Result<(), CartError> {
    if line.held {
        ctx.ledger.release_hold(&line.product_id, line.claim).await?;
    }
    Ok(())
}

impl Cart {
    async fn add_line(&mut self, input: CartLineInput, ctx: &CartContext) -> Result<CartLine, CartError> {
        if input.quantity == 0 {
            return Err(CartError::InvalidQuantity(0));
        }
        let key = CartItemKey::new(&input.product_id, input.variant_id.as_ref());
        if let Some(existing) = self.line(&key) {
            debug!(session_id = %self.session_id, %key, "Line already held, skipping");
            return Ok(existing.clone());
        }

        let mut line = CartLine {
            pack_size: ctx.catalog.pack_size(&input.product_id, input.variant_id.as_ref()),
            key,
            product_id: input.product_id,
            variant_id: input.variant_id,
            quantity: input.quantity,
            expires_at: ctx.clock.now() + ctx.window,
            held: false,
            claim: ClaimId::new(),
        };
        if !ctx.catalog.is_backorder(&line.product_id) {
            ctx.ledger
                .try_set_hold(&line.product_id, line.claim, line.units())
                .await?;
            line.held = true;
        }

        info!(
            session_id = %self.session_id,
            product_id = %line.product_id,
            units = line.units(),
            held = line.held,
            expires_at = %line.expires_at,
            "Line added"
        );
        self.lines.push(line.clone());
        Ok(line)
    }

    async fn change_quantity(
        &mut self,
        key: &CartItemKey,
        quantity: u32,
        ctx: &CartContext,
    ) -> Result<Option<CartLine>, CartError> {
        if quantity == 0 {
            return match self.remove_line(key, None, ctx).await? {
                Some(_) => Ok(None),
                None => Err(CartError::LineNotFound(key.clone())),
            };
        }
        let line = self
            .line(key)
            .cloned()
            .ok_or_else(|| CartError::LineNotFound(key.clone()))?;

        let claims_stock = line.held || !ctx.catalog.is_backorder(&line.product_id);
        let units = quantity.saturating_mul(line.pack_size);
        if claims_stock {
            ctx.ledger.try_set_hold(&line.product_id, line.claim, units).await?;
        }

        let Some(line) = self.line_mut(key) else {
            return Err(CartError::LineNotFound(key.clone()));
        };
        debug!(%key, from = line.quantity, to = quantity, units, "Quantity changed");
        line.quantity = quantity;
        line.held = claims_stock;
        Ok(Some(line.clone()))
    }

    async fn remove_line(
        &mut self,
        key: &CartItemKey,
        product_id: Option<&ProductId>,
        ctx: &CartContext,
    ) -> Result<Option<CartLine>, CartError> {
        let Some(line) = self.line(key) else {
            return Ok(None);
        };
        if product_id.is_some_and(|expected| expected != &line.product_id) {
            debug!(%key, "Line belongs to another product, not removed");
            return Ok(None);
        }
        release(line, ctx).await?;
        let removed = self.take_line(key);
        info!(session_id = %self.session_id, %key, "Line removed");
        Ok(removed)
    }

    async fn sweep_expired(
        &mut self,
        now: DateTime<Utc>,
        ctx: &CartContext,
    ) -> Result<Vec<CartLine>, CartError> {
        let expired: Vec<CartItemKey> = self
            .lines
            .iter()
            .filter(|line| line.is_expired(now))
            .map(|line| line.key.clone())
            .collect();

        let mut removed = Vec::with_capacity(expired.len());
        for key in expired {
            let Some(line) = self.line(&key) else {
                continue;
            };
            release(line, ctx).await?;
            if let Some(line) = self.take_line(&key) {
                info!(
                    session_id = %self.session_id,
                    product_id = %line.product_id,
                    units = line.units(),
                    "An item was removed because its reservation expired"
                );
                removed.push(line);
            }
        }
        Ok(removed)
    }

    async fn empty(&mut self, ctx: &CartContext) -> Result<Vec<CartLine>, CartError> {
        for line in &self.lines {
            release(line, ctx).await?;
        }
        let removed = std::mem::take(&mut self.lines);
        info!(session_id = %self.session_id, lines = removed.len(), "Cart emptied");
        Ok(removed)
    }

    async fn replace_lines(
        &mut self,
        incoming: Vec<CartLine>,
        keep: &[ClaimId],
        ctx: &CartContext,
    ) -> Result<Replaced, CartError> {
        let carried: HashSet<ClaimId> = incoming
            .iter()
            .map(|line| line.claim)
            .chain(keep.iter().copied())
            .collect();
        for line in self.lines.iter().filter(|line| !carried.contains(&line.claim)) {
            release(line, ctx).await?;
        }

        let mut lines = Vec::with_capacity(incoming.len());
        let mut dropped = Vec::new();
        for mut line in incoming {
            let claims_stock = !ctx.catalog.is_backorder(&line.product_id);
            if claims_stock {
                // A claim still holding its units is left unchanged; a released one must fit
                // into what is available now.
                match ctx
                    .ledger
                    .try_set_hold(&line.product_id, line.claim, line.units())
                    .await
                {
                    Ok(_) => {}
                    Err(LedgerError::InsufficientStock {
                        requested,
                        available,
                    }) => {
                        warn!(
                            session_id = %self.session_id,
                            product_id = %line.product_id,
                            requested,
                            available,
                            "Line no longer available, not loaded"
                        );
                        dropped.push(line);
                        continue;
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            line.held = claims_stock;
            lines.push(line);
        }
        self.lines = lines;
        info!(
            session_id = %self.session_id,
            lines = self.lines.len(),
            dropped = dropped.len(),
            "Lines replaced"
        );
        Ok(Replaced {
            lines: self.lines.clone(),
            dropped,
        })
    }

    async fn restore_lines(
        &mut self,
        returning: Vec<CartLine>,
        ctx: &CartContext,
    ) -> Result<Vec<CartLine>, CartError> {
        for line in returning {
            match self.line(&line.key) {
                Some(existing) if existing.claim == line.claim => {}
                Some(_) => release(&line, ctx).await?,
                None => self.lines.push(line),
            }
        }
        debug!(session_id = %self.session_id, lines = self.lines.len(), "Lines restored");
        Ok(self.lines.clone())
    }
}
