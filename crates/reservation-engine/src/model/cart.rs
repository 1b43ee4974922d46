//! Active carts and their line reservations.
//!
//! # Actor Framework
//! [`Cart`] implements [`ActorEntity`](actor_framework::ActorEntity) keyed by [`SessionId`].
//! Carts are implicit: the first action against a session materializes an empty cart, and
//! a cart whose last line goes away is retired. See
//! [`CartAction`](crate::cart_actor::CartAction) for the operations.

use crate::model::{ClaimId, ProductId, VariantId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Type-safe identifier for storefront sessions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session_{}", self.0)
    }
}

/// Identity of a line within a cart: one line per (product, variant).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CartItemKey(pub String);

impl CartItemKey {
    pub fn new(product_id: &ProductId, variant_id: Option<&VariantId>) -> Self {
        match variant_id {
            Some(variant_id) => Self(format!("{}:{}", product_id.0, variant_id.0)),
            None => Self(product_id.0.to_string()),
        }
    }
}

impl Display for CartItemKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "item_{}", self.0)
    }
}

/// One cart line and the stock it holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub key: CartItemKey,
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    /// Number of cases (or units for simple lines). Always > 0.
    pub quantity: u32,
    pub pack_size: u32,
    pub expires_at: DateTime<Utc>,
    /// Whether `units()` is currently claimed on the ledger under `claim`.
    pub held: bool,
    pub claim: ClaimId,
}

impl CartLine {
    /// Base units this line claims: `quantity × pack_size`.
    pub fn units(&self) -> u32 {
        self.quantity.saturating_mul(self.pack_size)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }

    /// Same product, variant and quantity.
    pub fn same_contents(&self, other: &CartLine) -> bool {
        self.product_id == other.product_id
            && self.variant_id == other.variant_id
            && self.quantity == other.quantity
    }
}

/// Payload of a line-added event from the host platform.
#[derive(Debug, Clone, PartialEq)]
pub struct CartLineInput {
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub quantity: u32,
}

impl CartLineInput {
    pub fn simple(product_id: impl Into<ProductId>, quantity: u32) -> Self {
        Self {
            product_id: product_id.into(),
            variant_id: None,
            quantity,
        }
    }

    pub fn variant(
        product_id: impl Into<ProductId>,
        variant_id: impl Into<VariantId>,
        quantity: u32,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            variant_id: Some(variant_id.into()),
            quantity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    pub session_id: SessionId,
    pub lines: Vec<CartLine>,
}

impl Cart {
    pub fn new(session_id: SessionId) -> Self {
        Self {
            session_id,
            lines: Vec::new(),
        }
    }

    pub fn line(&self, key: &CartItemKey) -> Option<&CartLine> {
        self.lines.iter().find(|line| &line.key == key)
    }

    pub(crate) fn line_mut(&mut self, key: &CartItemKey) -> Option<&mut CartLine> {
        self.lines.iter_mut().find(|line| &line.key == key)
    }

    pub(crate) fn take_line(&mut self, key: &CartItemKey) -> Option<CartLine> {
        let index = self.lines.iter().position(|line| &line.key == key)?;
        Some(self.lines.remove(index))
    }
}
