//! Custom actions for the Order actor.

use crate::model::{ExternalStatus, Order, ProductId};

#[derive(Debug, Clone)]
pub enum OrderAction {
    /// Releases every line's reservation and marks the order cancelled. A second
    /// cancellation is a no-op that still succeeds.
    Cancel { reason: Option<String> },
    /// The external system reported a new status for this order.
    ObserveExternalStatus(ExternalStatus),
    /// Stores the identifier and status returned by a successful external sync.
    RecordSync {
        external_id: String,
        external_status: ExternalStatus,
    },
    AddNote(String),
}

/// Results from OrderActions - variants match 1:1 with OrderAction
#[derive(Debug, Clone)]
pub enum OrderActionResult {
    /// Whether this call released the reservations.
    Cancel(bool),
    /// Products whose reserved stock changed and need an external refresh.
    ObserveExternalStatus(Vec<ProductId>),
    RecordSync(Order),
    AddNote(Order),
}
