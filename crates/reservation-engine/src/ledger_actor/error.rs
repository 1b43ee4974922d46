//! Error types for the Stock Ledger.

use actor_framework::FrameworkError;
use thiserror::Error;

/// Errors that can occur during ledger operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum LedgerError {
    /// A claim increase exceeds the product's available quantity.
    #[error("Insufficient stock: requested {requested}, available {available}")]
    InsufficientStock { requested: u32, available: u32 },

    /// An error occurred while communicating with the actor system.
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}

impl LedgerError {
    /// Recovers a ledger error raised inside the actor; anything else is a communication error.
    pub fn from_framework(e: FrameworkError) -> Self {
        e.into_entity_error::<LedgerError>()
            .unwrap_or_else(|other| LedgerError::ActorCommunicationError(other.to_string()))
    }
}
