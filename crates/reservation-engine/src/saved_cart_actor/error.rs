//! Error types for the Saved Cart actor.

use crate::ledger_actor::LedgerError;
use actor_framework::FrameworkError;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SavedCartError {
    /// Saving requires at least one line.
    #[error("Cannot save an empty cart")]
    EmptyCart,

    /// The owner already has a saved cart with this name.
    #[error("A saved cart named {0} already exists")]
    NameTaken(String),

    #[error("Saved cart not found: {0}")]
    NotFound(String),

    #[error("Ledger error: {0}")]
    Ledger(String),

    /// An error occurred while communicating with the actor system.
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}

impl From<LedgerError> for SavedCartError {
    fn from(e: LedgerError) -> Self {
        SavedCartError::Ledger(e.to_string())
    }
}

impl SavedCartError {
    pub fn from_framework(e: FrameworkError) -> Self {
        match e {
            FrameworkError::AlreadyExists(key) => SavedCartError::NameTaken(key),
            FrameworkError::NotFound(key) => SavedCartError::NotFound(key),
            other => other.into_entity_error::<SavedCartError>().unwrap_or_else(|other| {
                SavedCartError::ActorCommunicationError(other.to_string())
            }),
        }
    }
}
