//! Custom actions for the Cart actor.
//!
//! Every action that removes a line releases its hold in the same message, so no other
//! request (a concurrent sweep, a checkout) can see the line after its hold is gone.

use crate::model::{CartItemKey, CartLine, CartLineInput, ClaimId, ProductId};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub enum CartAction {
    /// Line-added event. An already held line with the same key is left as is.
    AddLine(CartLineInput),
    /// Quantity-changed event. `quantity = 0` removes the line.
    ChangeQuantity { key: CartItemKey, quantity: u32 },
    /// Explicit removal. With `product_id` set, the line is only removed when it matches.
    RemoveLine {
        key: CartItemKey,
        product_id: Option<ProductId>,
    },
    /// Releases and removes every line with `expires_at < now`.
    SweepExpired { now: DateTime<Utc> },
    /// Clears the cart, releasing every hold.
    Empty,
    /// Replaces every line, preserving the incoming `expires_at` and claims. Current lines
    /// whose claims are neither carried over nor listed in `keep` are released. An incoming
    /// line whose units can no longer be held is left out.
    ReplaceLines {
        lines: Vec<CartLine>,
        keep: Vec<ClaimId>,
    },
    /// Puts lines back after a failed hand-off. Keys already present win; the returning
    /// line's hold is released.
    RestoreLines(Vec<CartLine>),
    /// Removes every line without releasing: the holds move with the lines.
    TakeLines,
}

/// Results from CartActions - variants match 1:1 with CartAction
#[derive(Debug, Clone)]
pub enum CartActionResult {
    AddLine(CartLine),
    /// The line after the change, or `None` when it was removed.
    ChangeQuantity(Option<CartLine>),
    /// The removed line, or `None` when nothing matched.
    RemoveLine(Option<CartLine>),
    SweepExpired(Vec<CartLine>),
    Empty(Vec<CartLine>),
    ReplaceLines(Replaced),
    RestoreLines(Vec<CartLine>),
    TakeLines(Vec<CartLine>),
}

/// Outcome of [`CartAction::ReplaceLines`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Replaced {
    pub lines: Vec<CartLine>,
    /// Incoming lines whose stock was taken in the meantime.
    pub dropped: Vec<CartLine>,
}
