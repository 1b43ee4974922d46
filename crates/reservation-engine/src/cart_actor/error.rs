//! Error types for the Cart actor.

use crate::ledger_actor::LedgerError;
use crate::model::CartItemKey;
use actor_framework::FrameworkError;
use thiserror::Error;

/// Errors that can occur during cart operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CartError {
    /// Quantities must be positive; use `ChangeQuantity(0)` or `RemoveLine` to drop a line.
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(u32),

    /// The line does not exist in this cart.
    #[error("Cart line not found: {0}")]
    LineNotFound(CartItemKey),

    /// The requested increase exceeds what the product has available, in base units.
    #[error("Insufficient stock: requested {requested}, available {available}")]
    InsufficientStock { requested: u32, available: u32 },

    /// The ledger could not be reached.
    #[error("Ledger error: {0}")]
    Ledger(String),

    /// An error occurred while communicating with the actor system.
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}

impl From<LedgerError> for CartError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::InsufficientStock {
                requested,
                available,
            } => CartError::InsufficientStock {
                requested,
                available,
            },
            other => CartError::Ledger(other.to_string()),
        }
    }
}

impl CartError {
    pub fn from_framework(e: FrameworkError) -> Self {
        e.into_entity_error::<CartError>()
            .unwrap_or_else(|other| CartError::ActorCommunicationError(other.to_string()))
    }
}
