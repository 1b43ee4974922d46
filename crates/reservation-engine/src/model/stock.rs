//! Per-product stock counters.
//!
//! # Actor Framework
//! This struct implements the [`ActorEntity`](actor_framework::ActorEntity) trait,
//! allowing it to be managed by a [`ResourceActor`](actor_framework::ResourceActor).
//!
//! See [`impl ActorEntity for StockRecord`](StockRecord#impl-ActorEntity-for-StockRecord) for details on:
//! - Creation parameters ([`StockCreate`])
//! - Update parameters ([`StockUpdate`])
//! - Custom actions ([`LedgerAction`](crate::ledger_actor::LedgerAction))
//!
//! The counters are private: the only way to move them is through the ledger actions, each
//! of which runs inside a single actor message.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Display;
use uuid::Uuid;

use crate::model::OrderId;

/// Type-safe identifier for Products.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProductId(pub u64);

impl From<u64> for ProductId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "product_{}", self.0)
    }
}

/// Type-safe identifier for product variants (a selected option such as "case of 6").
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VariantId(pub u64);

impl From<u64> for VariantId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl Display for VariantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "variant_{}", self.0)
    }
}

/// Stock-keeping unit as known to the external inventory system.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sku(pub String);

impl From<&str> for Sku {
    fn from(sku: &str) -> Self {
        Self(sku.to_string())
    }
}

impl Display for Sku {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Token identifying one claim on a product's stock.
///
/// Cart lines get a random token when first held and keep it through save and load.
/// Order lines get a token derived from `(order, line)`, so re-running a checkout
/// conversion addresses the same reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClaimId(pub Uuid);

impl ClaimId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn for_order_line(order_id: &OrderId, line_id: u32) -> Self {
        let name = format!("{order_id}/line_{line_id}");
        Self(Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()))
    }
}

impl Default for ClaimId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for ClaimId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "claim_{}", self.0.simple())
    }
}

/// Point-in-time view of one product's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLevels {
    pub external_sellable: u32,
    pub held: u32,
    pub reserved: u32,
    /// `max(0, external_sellable - reserved - held)`: gates add-to-cart and increases.
    pub available: u32,
    /// `max(0, external_sellable - reserved)`: storefront stock after an order sync.
    pub display: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockRecord {
    pub product_id: ProductId,
    external_sellable: u32,
    held: u32,
    reserved: u32,
    holds: HashMap<ClaimId, u32>,
    reservations: HashMap<ClaimId, u32>,
}

/// Applies a signed delta and clamps the result into `0..=u32::MAX`.
fn clamp_apply(current: u32, delta: i64) -> u32 {
    (i64::from(current) + delta).clamp(0, i64::from(u32::MAX)) as u32
}

impl StockRecord {
    /// Creates a record with zero held and reserved stock.
    pub fn new(product_id: ProductId, external_sellable: u32) -> Self {
        Self {
            product_id,
            external_sellable,
            held: 0,
            reserved: 0,
            holds: HashMap::new(),
            reservations: HashMap::new(),
        }
    }

    pub fn external_sellable(&self) -> u32 {
        self.external_sellable
    }

    pub fn held(&self) -> u32 {
        self.held
    }

    pub fn reserved(&self) -> u32 {
        self.reserved
    }

    pub fn available(&self) -> u32 {
        clamp_apply(self.external_sellable, -i64::from(self.reserved) - i64::from(self.held))
    }

    pub fn display(&self) -> u32 {
        clamp_apply(self.external_sellable, -i64::from(self.reserved))
    }

    pub fn levels(&self) -> StockLevels {
        StockLevels {
            external_sellable: self.external_sellable,
            held: self.held,
            reserved: self.reserved,
            available: self.available(),
            display: self.display(),
        }
    }

    /// Units currently recorded under a hold claim.
    pub fn hold_of(&self, claim: &ClaimId) -> u32 {
        self.holds.get(claim).copied().unwrap_or(0)
    }

    /// Units currently recorded under a reservation claim.
    pub fn reservation_of(&self, claim: &ClaimId) -> u32 {
        self.reservations.get(claim).copied().unwrap_or(0)
    }

    // --- Raw counter operations (clamp at zero) ---

    pub fn adjust_held(&mut self, delta: i64) -> u32 {
        self.held = clamp_apply(self.held, delta);
        self.held
    }

    pub fn adjust_reserved(&mut self, delta: i64) -> u32 {
        self.reserved = clamp_apply(self.reserved, delta);
        self.reserved
    }

    /// Overwrites the externally sourced quantity. Held and reserved are untouched.
    pub fn refresh_external(&mut self, quantity: u32) {
        self.external_sellable = quantity;
    }

    // --- Claim operations ---

    /// Sets `claim` to exactly `units`, moving `held` by the difference only.
    ///
    /// Returns the delta applied. Repeating the call is a no-op.
    pub fn set_hold(&mut self, claim: ClaimId, units: u32) -> i64 {
        let delta = i64::from(units) - i64::from(self.hold_of(&claim));
        if units == 0 {
            self.holds.remove(&claim);
        } else {
            self.holds.insert(claim, units);
        }
        self.adjust_held(delta);
        delta
    }

    /// Like [`set_hold`](Self::set_hold), but an increase larger than `available` is
    /// rejected and leaves the record untouched.
    ///
    /// Returns `Err((requested, available))` on rejection.
    pub fn try_set_hold(&mut self, claim: ClaimId, units: u32) -> Result<i64, (u32, u32)> {
        let current = self.hold_of(&claim);
        if units > current {
            let increase = units - current;
            let available = self.available();
            if increase > available {
                return Err((increase, available));
            }
        }
        Ok(self.set_hold(claim, units))
    }

    /// Converts a hold into a reservation.
    ///
    /// Whatever the hold claim still has is released and `units` are reserved under
    /// `reservation`. Returns `false` without touching anything when `reservation` is
    /// already recorded.
    pub fn transfer_hold(&mut self, hold: Option<ClaimId>, reservation: ClaimId, units: u32) -> bool {
        if self.reservations.contains_key(&reservation) {
            return false;
        }
        if let Some(hold) = hold {
            self.set_hold(hold, 0);
        }
        self.set_reservation(reservation, units);
        true
    }

    /// Sets `claim` to exactly `units` reserved. Returns the delta applied.
    pub fn set_reservation(&mut self, claim: ClaimId, units: u32) -> i64 {
        let delta = i64::from(units) - i64::from(self.reservation_of(&claim));
        if units == 0 {
            self.reservations.remove(&claim);
        } else {
            self.reservations.insert(claim, units);
        }
        self.adjust_reserved(delta);
        delta
    }
}

/// Payload for seeding a stock record with a known external quantity.
#[derive(Debug, Clone)]
pub struct StockCreate {
    pub external_sellable: u32,
}

/// Catalog-sync overwrite of the external quantity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockUpdate {
    pub external_sellable: Option<u32>,
}
