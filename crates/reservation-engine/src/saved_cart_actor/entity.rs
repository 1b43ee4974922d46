//! [`ActorEntity`] implementation for [`SavedCart`].
//!
//! A saved cart whose last line is swept or removed is retired in the same message.
//! Deleting a saved cart releases whatever its remaining lines still hold; lines whose
//! claims were already released or converted make that a no-op.

use super::actions::{SavedCartAction, SavedCartActionResult};
use super::error::SavedCartError;
use super::SavedCartContext;
use crate::model::{CartLine, SavedCart, SavedCartCreate, SavedCartKey};
use actor_framework::ActorEntity;
use async_trait::async_trait;
use tracing::info;

#[async_trait]
impl ActorEntity for SavedCart {
    type Id = SavedCartKey;
    type Create = SavedCartCreate;
    type Update = ();
    type Action = SavedCartAction;
    type ActionResult = SavedCartActionResult;
    type Context = SavedCartContext;
    type Error = SavedCartError;

    fn from_create_params(key: SavedCartKey, params: SavedCartCreate) -> Result<Self, Self::Error> {
        if params.lines.is_empty() {
            return Err(SavedCartError::EmptyCart);
        }
        Ok(Self {
            key,
            lines: params.lines,
            saved_at: params.saved_at,
            updated_at: params.saved_at,
        })
    }

    fn is_retired(&self) -> bool {
        self.lines.is_empty()
    }

    async fn on_update(&mut self, _update: (), _ctx: &SavedCartContext) -> Result<(), Self::Error> {
        Ok(())
    }

    async fn on_delete(&self, ctx: &SavedCartContext) -> Result<(), Self::Error> {
        for line in &self.lines {
            release(line, ctx).await?;
        }
        info!(key = %self.key, lines = self.lines.len(), "Saved cart holds released");
        Ok(())
    }

    async fn handle_action(
        &mut self,
        action: SavedCartAction,
        ctx: &SavedCartContext,
    ) -> Result<SavedCartActionResult, Self::Error> {
        match action {
            SavedCartAction::MergeLines { lines, now } => {
                for incoming in lines {
                    match self.lines.iter().position(|line| line.key == incoming.key) {
                        Some(index) => {
                            let existing = &self.lines[index];
                            if existing.claim != incoming.claim {
                                // The saved claim is about to lose its only reference.
                                release(existing, ctx).await?;
                            }
                            self.lines[index] = incoming;
                        }
                        None => self.lines.push(incoming),
                    }
                }
                self.updated_at = now;
                info!(key = %self.key, lines = self.lines.len(), "Saved cart updated in place");
                Ok(SavedCartActionResult::MergeLines(self.clone()))
            }
            SavedCartAction::SweepExpired { now } => {
                let mut removed = Vec::new();
                let mut index = 0;
                while index < self.lines.len() {
                    if self.lines[index].is_expired(now) {
                        release(&self.lines[index], ctx).await?;
                        removed.push(self.lines.remove(index));
                    } else {
                        index += 1;
                    }
                }
                if !removed.is_empty() {
                    info!(key = %self.key, removed = removed.len(), remaining = self.lines.len(), "Saved cart swept");
                }
                Ok(SavedCartActionResult::SweepExpired(removed))
            }
            SavedCartAction::RemoveLine { key } => {
                let Some(index) = self.lines.iter().position(|line| line.key == key) else {
                    return Ok(SavedCartActionResult::RemoveLine(None));
                };
                release(&self.lines[index], ctx).await?;
                let removed = self.lines.remove(index);
                info!(key = %self.key, line = %removed.key, "Saved cart line removed");
                Ok(SavedCartActionResult::RemoveLine(Some(removed)))
            }
        }
    }
}

async fn release(line: &CartLine, ctx: &SavedCartContext) -> Result<(), SavedCartError> {
    if line.held {
        ctx.ledger.release_hold(&line.product_id, line.claim).await?;
    }
    Ok(())
}
