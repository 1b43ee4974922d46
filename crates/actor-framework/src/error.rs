//! # Framework Errors
//!
//! Errors raised by the actor plumbing itself, plus a carrier for the entity's own error.
//! Client wrappers turn these into their resource-specific error types; domain errors are
//! recovered intact with [`FrameworkError::into_entity_error`].

/// Errors that can occur within the actor framework itself.
#[derive(Debug, thiserror::Error)]
pub enum FrameworkError {
    #[error("Actor closed")]
    ActorClosed,
    #[error("Actor dropped response channel")]
    ActorDropped,
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Item already exists: {0}")]
    AlreadyExists(String),
    #[error("Entity error: {0}")]
    EntityError(Box<dyn std::error::Error + Send + Sync>),
}

impl FrameworkError {
    /// Wraps an entity error so it can travel back over the response channel.
    pub fn entity<E: std::error::Error + Send + Sync + 'static>(error: E) -> Self {
        Self::EntityError(Box::new(error))
    }

    /// Recovers the concrete entity error, or hands the framework error back unchanged.
    pub fn into_entity_error<E: std::error::Error + 'static>(self) -> Result<E, Self> {
        match self {
            Self::EntityError(inner) => match inner.downcast::<E>() {
                Ok(concrete) => Ok(*concrete),
                Err(other) => Err(Self::EntityError(other)),
            },
            other => Err(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, thiserror::Error)]
    #[error("out of stock")]
    struct OutOfStock;

    #[test]
    fn entity_error_round_trips_through_downcast() {
        let err = FrameworkError::entity(OutOfStock);
        assert_eq!(err.into_entity_error::<OutOfStock>().unwrap(), OutOfStock);
    }

    #[test]
    fn other_variants_are_handed_back() {
        let err = FrameworkError::NotFound("cart_7".into());
        let back = err.into_entity_error::<OutOfStock>().unwrap_err();
        assert!(matches!(back, FrameworkError::NotFound(id) if id == "cart_7"));
    }
}
