//! Error types for the Order actor.

use crate::ledger_actor::LedgerError;
use crate::model::OrderStatus;
use actor_framework::FrameworkError;
use thiserror::Error;

/// Errors that can occur during order operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum OrderError {
    /// An order needs at least one line.
    #[error("Order has no lines")]
    EmptyOrder,

    #[error("Invalid quantity on line {line_id}")]
    InvalidQuantity { line_id: u32 },

    /// Cancellation goes through the cancel action; cancelled orders are final.
    #[error("Invalid status transition from {from:?} to {to:?}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("Order not found: {0}")]
    NotFound(String),

    /// The order id was already placed; its lines were converted by the first placement.
    #[error("Order already placed: {0}")]
    AlreadyPlaced(String),

    #[error("Ledger error: {0}")]
    Ledger(String),

    /// An error occurred while communicating with the actor system.
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}

impl From<LedgerError> for OrderError {
    fn from(e: LedgerError) -> Self {
        OrderError::Ledger(e.to_string())
    }
}

impl OrderError {
    pub fn from_framework(e: FrameworkError) -> Self {
        match e {
            FrameworkError::NotFound(id) => OrderError::NotFound(id),
            FrameworkError::AlreadyExists(id) => OrderError::AlreadyPlaced(id),
            other => other.into_entity_error::<OrderError>().unwrap_or_else(|other| {
                OrderError::ActorCommunicationError(other.to_string())
            }),
        }
    }
}
