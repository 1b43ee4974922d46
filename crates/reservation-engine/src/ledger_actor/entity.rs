//! [`ActorEntity`] implementation for [`StockRecord`].
//!
//! Records are implicit: the first action against an unknown product materializes a record
//! with zero external stock, and records are never retired.

use super::actions::{LedgerAction, LedgerActionResult};
use super::error::LedgerError;
use crate::model::{ProductId, StockCreate, StockRecord, StockUpdate};
use actor_framework::ActorEntity;
use async_trait::async_trait;
use tracing::{debug, warn};

#[async_trait]
impl ActorEntity for StockRecord {
    type Id = ProductId;
    type Create = StockCreate;
    type Update = StockUpdate;
    type Action = LedgerAction;
    type ActionResult = LedgerActionResult;
    type Context = ();
    type Error = LedgerError;

    fn from_create_params(id: ProductId, params: StockCreate) -> Result<Self, Self::Error> {
        Ok(Self::new(id, params.external_sellable))
    }

    fn implicit(id: &ProductId) -> Option<Self> {
        Some(Self::new(id.clone(), 0))
    }

    async fn on_update(&mut self, update: StockUpdate, _ctx: &()) -> Result<(), Self::Error> {
        if let Some(quantity) = update.external_sellable {
            self.refresh_external(quantity);
        }
        Ok(())
    }

    async fn handle_action(
        &mut self,
        action: LedgerAction,
        _ctx: &(),
    ) -> Result<LedgerActionResult, Self::Error> {
        let product_id = self.product_id.clone();
        let result = match action {
            LedgerAction::GetAvailable => LedgerActionResult::GetAvailable(self.available()),
            LedgerAction::AdjustHeld(delta) => {
                LedgerActionResult::AdjustHeld(self.adjust_held(delta))
            }
            LedgerAction::AdjustReserved(delta) => {
                LedgerActionResult::AdjustReserved(self.adjust_reserved(delta))
            }
            LedgerAction::RefreshExternal(quantity) => {
                self.refresh_external(quantity);
                LedgerActionResult::RefreshExternal(self.levels())
            }
            LedgerAction::SetHold { claim, units } => {
                let delta = self.set_hold(claim, units);
                debug!(%product_id, %claim, units, delta, held = self.held(), "Hold set");
                LedgerActionResult::SetHold(self.levels())
            }
            LedgerAction::TrySetHold { claim, units } => {
                match self.try_set_hold(claim, units) {
                    Ok(delta) => {
                        debug!(%product_id, %claim, units, delta, held = self.held(), "Hold set");
                        LedgerActionResult::TrySetHold(self.levels())
                    }
                    Err((requested, available)) => {
                        warn!(%product_id, %claim, requested, available, "Hold rejected");
                        return Err(LedgerError::InsufficientStock {
                            requested,
                            available,
                        });
                    }
                }
            }
            LedgerAction::TransferHold {
                hold,
                reservation,
                units,
            } => {
                let moved = self.transfer_hold(hold, reservation, units);
                debug!(%product_id, %reservation, units, moved, "Hold transferred");
                LedgerActionResult::TransferHold(moved)
            }
            LedgerAction::SetReservation { claim, units } => {
                let delta = self.set_reservation(claim, units);
                debug!(%product_id, %claim, units, delta, reserved = self.reserved(), "Reservation set");
                LedgerActionResult::SetReservation(self.levels())
            }
            LedgerAction::Levels => LedgerActionResult::Levels(self.levels()),
        };
        Ok(result)
    }
}
