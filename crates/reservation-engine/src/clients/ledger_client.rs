//! # Ledger Client
//!
//! Routes each product to its ledger shard and exposes the ledger contract as typed methods.
//! Callers never see the shards, only products.

use crate::ledger_actor::{LedgerAction, LedgerActionResult, LedgerError};
use crate::model::{ClaimId, ProductId, StockLevels, StockRecord};
use actor_framework::ResourceClient;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Client for the sharded Stock Ledger.
#[derive(Clone)]
pub struct LedgerClient {
    shards: Arc<[ResourceClient<StockRecord>]>,
}

fn unexpected(result: LedgerActionResult) -> LedgerError {
    LedgerError::ActorCommunicationError(format!("unexpected ledger result: {result:?}"))
}

impl LedgerClient {
    /// Wraps one client per shard. Shard order defines routing and must stay fixed.
    pub fn new(shards: Vec<ResourceClient<StockRecord>>) -> Self {
        Self {
            shards: shards.into(),
        }
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    fn shard(&self, product_id: &ProductId) -> Result<&ResourceClient<StockRecord>, LedgerError> {
        if self.shards.is_empty() {
            return Err(LedgerError::ActorCommunicationError(
                "ledger has no shards".to_string(),
            ));
        }
        let mut hasher = DefaultHasher::new();
        product_id.hash(&mut hasher);
        let index = (hasher.finish() % self.shards.len() as u64) as usize;
        Ok(&self.shards[index])
    }

    async fn act(
        &self,
        product_id: &ProductId,
        action: LedgerAction,
    ) -> Result<LedgerActionResult, LedgerError> {
        self.shard(product_id)?
            .perform_action(product_id.clone(), action)
            .await
            .map_err(LedgerError::from_framework)
    }

    /// Availability for add-to-cart gating. Uses the last known external quantity.
    #[instrument(skip(self))]
    pub async fn get_available(&self, product_id: &ProductId) -> Result<u32, LedgerError> {
        match self.act(product_id, LedgerAction::GetAvailable).await? {
            LedgerActionResult::GetAvailable(available) => Ok(available),
            other => Err(unexpected(other)),
        }
    }

    #[instrument(skip(self))]
    pub async fn adjust_held(&self, product_id: &ProductId, delta: i64) -> Result<u32, LedgerError> {
        match self.act(product_id, LedgerAction::AdjustHeld(delta)).await? {
            LedgerActionResult::AdjustHeld(held) => Ok(held),
            other => Err(unexpected(other)),
        }
    }

    #[instrument(skip(self))]
    pub async fn adjust_reserved(
        &self,
        product_id: &ProductId,
        delta: i64,
    ) -> Result<u32, LedgerError> {
        match self.act(product_id, LedgerAction::AdjustReserved(delta)).await? {
            LedgerActionResult::AdjustReserved(reserved) => Ok(reserved),
            other => Err(unexpected(other)),
        }
    }

    #[instrument(skip(self))]
    pub async fn refresh_external(
        &self,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<StockLevels, LedgerError> {
        match self.act(product_id, LedgerAction::RefreshExternal(quantity)).await? {
            LedgerActionResult::RefreshExternal(levels) => Ok(levels),
            other => Err(unexpected(other)),
        }
    }

    #[instrument(skip(self))]
    pub async fn set_hold(
        &self,
        product_id: &ProductId,
        claim: ClaimId,
        units: u32,
    ) -> Result<StockLevels, LedgerError> {
        match self.act(product_id, LedgerAction::SetHold { claim, units }).await? {
            LedgerActionResult::SetHold(levels) => Ok(levels),
            other => Err(unexpected(other)),
        }
    }

    /// Releases a hold claim. Releasing an unknown or already released claim is a no-op.
    pub async fn release_hold(
        &self,
        product_id: &ProductId,
        claim: ClaimId,
    ) -> Result<StockLevels, LedgerError> {
        self.set_hold(product_id, claim, 0).await
    }

    #[instrument(skip(self))]
    pub async fn try_set_hold(
        &self,
        product_id: &ProductId,
        claim: ClaimId,
        units: u32,
    ) -> Result<StockLevels, LedgerError> {
        match self.act(product_id, LedgerAction::TrySetHold { claim, units }).await? {
            LedgerActionResult::TrySetHold(levels) => Ok(levels),
            other => Err(unexpected(other)),
        }
    }

    #[instrument(skip(self))]
    pub async fn transfer_hold(
        &self,
        product_id: &ProductId,
        hold: Option<ClaimId>,
        reservation: ClaimId,
        units: u32,
    ) -> Result<bool, LedgerError> {
        let action = LedgerAction::TransferHold {
            hold,
            reservation,
            units,
        };
        match self.act(product_id, action).await? {
            LedgerActionResult::TransferHold(moved) => Ok(moved),
            other => Err(unexpected(other)),
        }
    }

    #[instrument(skip(self))]
    pub async fn set_reservation(
        &self,
        product_id: &ProductId,
        claim: ClaimId,
        units: u32,
    ) -> Result<StockLevels, LedgerError> {
        match self
            .act(product_id, LedgerAction::SetReservation { claim, units })
            .await?
        {
            LedgerActionResult::SetReservation(levels) => Ok(levels),
            other => Err(unexpected(other)),
        }
    }

    #[instrument(skip(self))]
    pub async fn levels(&self, product_id: &ProductId) -> Result<StockLevels, LedgerError> {
        match self.act(product_id, LedgerAction::Levels).await? {
            LedgerActionResult::Levels(levels) => Ok(levels),
            other => Err(unexpected(other)),
        }
    }

    /// Snapshot of every materialized record across all shards, sorted by product.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<StockRecord>, LedgerError> {
        debug!(shards = self.shards.len(), "Listing ledger");
        let mut records = Vec::new();
        for shard in self.shards.iter() {
            records.extend(shard.list().await.map_err(LedgerError::from_framework)?);
        }
        records.sort_by(|a, b| a.product_id.cmp(&b.product_id));
        Ok(records)
    }
}
