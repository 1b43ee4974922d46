//! # Saved Cart Client
use crate::model::{CartItemKey, CartLine, SavedCart, SavedCartCreate, SavedCartKey};
use crate::saved_cart_actor::{SavedCartAction, SavedCartActionResult, SavedCartError};
use actor_framework::{ActorClient, FrameworkError, ResourceClient};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{instrument, warn};

/// Client for interacting with the Saved Cart actor.
#[derive(Clone)]
pub struct SavedCartClient {
    inner: ResourceClient<SavedCart>,
}

#[async_trait]
impl ActorClient<SavedCart> for SavedCartClient {
    type Error = SavedCartError;

    fn inner(&self) -> &ResourceClient<SavedCart> {
        &self.inner
    }

    fn map_error(e: FrameworkError) -> Self::Error {
        SavedCartError::from_framework(e)
    }
}

fn unexpected(result: SavedCartActionResult) -> SavedCartError {
    SavedCartError::ActorCommunicationError(format!("unexpected saved cart result: {result:?}"))
}

impl SavedCartClient {
    pub fn new(inner: ResourceClient<SavedCart>) -> Self {
        Self { inner }
    }

    /// Fails with `NameTaken` when the owner already uses the name, `EmptyCart` without lines.
    #[instrument(skip(self, lines))]
    pub async fn create(
        &self,
        key: SavedCartKey,
        lines: Vec<CartLine>,
        saved_at: DateTime<Utc>,
    ) -> Result<SavedCartKey, SavedCartError> {
        self.inner
            .create(key, SavedCartCreate { lines, saved_at })
            .await
            .map_err(SavedCartError::from_framework)
    }

    #[instrument(skip(self, lines))]
    pub async fn merge_lines(
        &self,
        key: &SavedCartKey,
        lines: Vec<CartLine>,
        now: DateTime<Utc>,
    ) -> Result<SavedCart, SavedCartError> {
        match self
            .inner
            .perform_action(key.clone(), SavedCartAction::MergeLines { lines, now })
            .await
            .map_err(SavedCartError::from_framework)?
        {
            SavedCartActionResult::MergeLines(saved) => Ok(saved),
            other => Err(unexpected(other)),
        }
    }

    #[instrument(skip(self))]
    pub async fn remove_line(
        &self,
        key: &SavedCartKey,
        line_key: &CartItemKey,
    ) -> Result<Option<CartLine>, SavedCartError> {
        let action = SavedCartAction::RemoveLine {
            key: line_key.clone(),
        };
        match self
            .inner
            .perform_action(key.clone(), action)
            .await
            .map_err(SavedCartError::from_framework)?
        {
            SavedCartActionResult::RemoveLine(line) => Ok(line),
            other => Err(unexpected(other)),
        }
    }

    /// Sweeps every saved cart in one actor message. Emptied carts are retired.
    #[instrument(skip(self))]
    pub async fn sweep_expired(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<(SavedCartKey, CartLine)>, SavedCartError> {
        let results = self
            .inner
            .for_each(SavedCartAction::SweepExpired { now })
            .await
            .map_err(SavedCartError::from_framework)?;

        let mut removed = Vec::new();
        for (key, result) in results {
            match result {
                Ok(SavedCartActionResult::SweepExpired(lines)) => {
                    removed.extend(lines.into_iter().map(|line| (key.clone(), line)));
                }
                Ok(other) => return Err(unexpected(other)),
                Err(e) => warn!(%key, error = %e, "Saved cart sweep failed"),
            }
        }
        Ok(removed)
    }
}
