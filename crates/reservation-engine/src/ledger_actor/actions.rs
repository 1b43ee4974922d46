//! Custom actions for the Stock Ledger.
//!
//! Each action is one actor message, so each is atomic with respect to every other action
//! on the same product. Deltas follow one sign convention: positive claims stock, negative
//! releases it.

use crate::model::{ClaimId, StockLevels};

#[derive(Debug, Clone)]
pub enum LedgerAction {
    /// `max(0, external_sellable - reserved - held)` from the last known external value.
    GetAvailable,
    /// `held = max(0, held + delta)`.
    AdjustHeld(i64),
    /// `reserved = max(0, reserved + delta)`.
    AdjustReserved(i64),
    /// Overwrites the external sellable quantity.
    RefreshExternal(u32),
    /// Sets a hold claim to an absolute amount. `units = 0` removes the claim.
    SetHold { claim: ClaimId, units: u32 },
    /// As `SetHold`, but an increase beyond `available` fails with `InsufficientStock`.
    TrySetHold { claim: ClaimId, units: u32 },
    /// Releases `hold` (if any) and reserves `units` under `reservation`, once.
    TransferHold {
        hold: Option<ClaimId>,
        reservation: ClaimId,
        units: u32,
    },
    /// Sets a reservation claim to an absolute amount. `units = 0` removes the claim.
    SetReservation { claim: ClaimId, units: u32 },
    /// Read-only snapshot.
    Levels,
}

/// Results from LedgerActions - variants match 1:1 with LedgerAction
#[derive(Debug, Clone)]
pub enum LedgerActionResult {
    GetAvailable(u32),
    AdjustHeld(u32),
    AdjustReserved(u32),
    RefreshExternal(StockLevels),
    SetHold(StockLevels),
    TrySetHold(StockLevels),
    /// `false` when the reservation was already recorded.
    TransferHold(bool),
    SetReservation(StockLevels),
    Levels(StockLevels),
}
