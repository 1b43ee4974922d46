//! Custom actions for the Saved Cart actor.

use crate::model::{CartItemKey, CartLine, SavedCart};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub enum SavedCartAction {
    /// Update-in-place: active-cart lines overwrite saved lines with the same key, new keys
    /// are appended.
    MergeLines {
        lines: Vec<CartLine>,
        now: DateTime<Utc>,
    },
    /// Releases and drops every line with `expires_at < now`.
    SweepExpired { now: DateTime<Utc> },
    /// Releases and drops one line.
    RemoveLine { key: CartItemKey },
}

/// Results from SavedCartActions - variants match 1:1 with SavedCartAction
#[derive(Debug, Clone)]
pub enum SavedCartActionResult {
    MergeLines(SavedCart),
    SweepExpired(Vec<CartLine>),
    RemoveLine(Option<CartLine>),
}
