//! # Multi-Cart Store
//!
//! Named, owner-scoped snapshots of the active cart, coordinated across the Cart and Saved
//! Cart actors. Which saved cart (if any) the active cart currently mirrors is session state
//! passed in explicitly as a [`SessionContext`].
//!
//! A loaded cart and the active cart share claims: the active lines *are* the saved lines
//! while the cart is loaded, so the stock is held once. Every other pair of carts holds under
//! distinct claims.

use crate::cart_actor::{CartError, Replaced};
use crate::clients::{CartClient, LedgerClient, SavedCartClient};
use crate::clock::Clock;
use crate::model::{
    CartItemKey, CartLine, ClaimId, OwnerId, ProductId, SavedCart, SavedCartKey, SessionId,
    VariantId,
};
use crate::saved_cart_actor::SavedCartError;
use actor_framework::ActorClient;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, instrument, warn};

/// Per-request session state handed in by the host platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    pub session_id: SessionId,
    pub owner_id: OwnerId,
    /// Name of the saved cart currently mirrored into the active cart.
    pub loaded_cart_name: Option<String>,
}

impl SessionContext {
    pub fn new(session_id: impl Into<SessionId>, owner_id: impl Into<OwnerId>) -> Self {
        Self {
            session_id: session_id.into(),
            owner_id: owner_id.into(),
            loaded_cart_name: None,
        }
    }

    fn key(&self, name: &str) -> SavedCartKey {
        SavedCartKey::new(self.owner_id.clone(), name)
    }

    fn loaded_key(&self) -> Option<SavedCartKey> {
        self.loaded_cart_name.as_deref().map(|name| self.key(name))
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum MultiCartError {
    #[error("Cannot save an empty cart")]
    EmptyCart,

    #[error("A saved cart named {0} already exists")]
    NameTaken(String),

    #[error("Saved cart not found: {0}")]
    NotFound(String),

    /// Updating in place only applies to the cart the session has loaded.
    #[error("Saved cart {0} is not the loaded cart")]
    NotLoaded(String),

    #[error(transparent)]
    Cart(#[from] CartError),

    #[error(transparent)]
    SavedCart(SavedCartError),
}

impl From<SavedCartError> for MultiCartError {
    fn from(e: SavedCartError) -> Self {
        match e {
            SavedCartError::EmptyCart => MultiCartError::EmptyCart,
            SavedCartError::NameTaken(name) => MultiCartError::NameTaken(name),
            SavedCartError::NotFound(name) => MultiCartError::NotFound(name),
            other => MultiCartError::SavedCart(other),
        }
    }
}

impl From<crate::ledger_actor::LedgerError> for MultiCartError {
    fn from(e: crate::ledger_actor::LedgerError) -> Self {
        MultiCartError::Cart(e.into())
    }
}

/// Saves, loads, updates and deletes named carts for a session.
#[derive(Clone)]
pub struct MultiCartStore {
    carts: CartClient,
    saved: SavedCartClient,
    ledger: LedgerClient,
    clock: Arc<dyn Clock>,
}

impl MultiCartStore {
    pub fn new(
        carts: CartClient,
        saved: SavedCartClient,
        ledger: LedgerClient,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            carts,
            saved,
            ledger,
            clock,
        }
    }

    /// Moves the active cart's lines into a new saved cart named `name`.
    ///
    /// Holds move with the lines. Lines that still belong to the loaded cart are copied under
    /// fresh claims instead, since the loaded cart keeps holding its own.
    #[instrument(skip(self))]
    pub async fn save(&self, ctx: &mut SessionContext, name: &str) -> Result<SavedCart, MultiCartError> {
        let key = ctx.key(name);
        if self.saved.get(key.clone()).await?.is_some() {
            return Err(MultiCartError::NameTaken(key.to_string()));
        }

        let taken = self.carts.take_lines(&ctx.session_id).await?;
        if taken.is_empty() {
            return Err(MultiCartError::EmptyCart);
        }

        let shared = self.loaded_claims(ctx).await?;
        let (lines, forked) = match self.fork_shared(taken.clone(), &shared).await {
            Ok(result) => result,
            Err(e) => {
                self.carts.restore_lines(&ctx.session_id, taken).await?;
                return Err(e);
            }
        };

        let now = self.clock.now();
        if let Err(e) = self.saved.create(key.clone(), lines, now).await {
            warn!(%key, error = %e, "Save failed, restoring the active cart");
            for line in &forked {
                self.ledger.release_hold(&line.product_id, line.claim).await?;
            }
            self.carts.restore_lines(&ctx.session_id, taken).await?;
            return Err(e.into());
        }

        ctx.loaded_cart_name = None;
        info!(%key, forked = forked.len(), "Active cart saved");
        self.saved
            .get(key.clone())
            .await?
            .ok_or_else(|| MultiCartError::NotFound(key.to_string()))
    }

    /// Replaces the active cart with the saved cart `name`, keeping each line's `expires_at`.
    ///
    /// Active lines that are not part of either the new or the previously loaded cart are
    /// released. A saved line whose hold was released and whose stock has since been taken
    /// cannot be held again: it is removed from the saved cart and returned in
    /// [`Replaced::dropped`].
    #[instrument(skip(self))]
    pub async fn load(&self, ctx: &mut SessionContext, name: &str) -> Result<Replaced, MultiCartError> {
        let key = ctx.key(name);
        let saved = self
            .saved
            .get(key.clone())
            .await?
            .ok_or_else(|| MultiCartError::NotFound(key.to_string()))?;

        let keep: Vec<ClaimId> = match ctx.loaded_key() {
            Some(loaded) if loaded != key => self.claims_of(&loaded).await?.into_iter().collect(),
            _ => Vec::new(),
        };
        let replaced = self
            .carts
            .replace_lines(&ctx.session_id, saved.lines, keep)
            .await?;
        for line in &replaced.dropped {
            warn!(%key, product_id = %line.product_id, "Saved line dropped on load");
            self.saved.remove_line(&key, &line.key).await?;
        }

        // Every line dropped means the saved cart retired with its last line.
        ctx.loaded_cart_name = (!replaced.lines.is_empty()).then(|| name.to_string());
        info!(
            %key,
            lines = replaced.lines.len(),
            dropped = replaced.dropped.len(),
            "Saved cart loaded"
        );
        Ok(replaced)
    }

    /// Merges the active cart into the loaded saved cart by line identity.
    #[instrument(skip(self))]
    pub async fn update_in_place(
        &self,
        ctx: &SessionContext,
        name: &str,
    ) -> Result<SavedCart, MultiCartError> {
        if ctx.loaded_cart_name.as_deref() != Some(name) {
            return Err(MultiCartError::NotLoaded(name.to_string()));
        }
        let lines = self.carts.lines(&ctx.session_id).await?;
        let saved = self
            .saved
            .merge_lines(&ctx.key(name), lines, self.clock.now())
            .await?;
        Ok(saved)
    }

    /// Deletes a saved cart, releasing what its lines still hold. Deleting the loaded cart also
    /// empties the active cart.
    #[instrument(skip(self))]
    pub async fn delete(&self, ctx: &mut SessionContext, name: &str) -> Result<(), MultiCartError> {
        let key = ctx.key(name);
        self.saved.delete(key.clone()).await?;

        if ctx.loaded_cart_name.as_deref() == Some(name) {
            self.carts.empty(&ctx.session_id).await?;
            ctx.loaded_cart_name = None;
        }
        info!(%key, "Saved cart deleted");
        Ok(())
    }

    /// Active lines that differ from the loaded cart by product, variant or quantity.
    ///
    /// With nothing loaded, or a loaded cart that no longer exists, every line is unsaved.
    #[instrument(skip(self))]
    pub async fn pre_toggle_check(&self, ctx: &SessionContext) -> Result<Vec<CartLine>, MultiCartError> {
        let active = self.carts.lines(&ctx.session_id).await?;
        let stored = match ctx.loaded_key() {
            Some(key) => self.saved.get(key).await?.map(|cart| cart.lines),
            None => None,
        }
        .unwrap_or_default();

        Ok(active
            .into_iter()
            .filter(|line| !stored.iter().any(|saved| saved.same_contents(line)))
            .collect())
    }

    /// Drops unsaved lines flagged by [`pre_toggle_check`](Self::pre_toggle_check).
    #[instrument(skip(self, keys))]
    pub async fn discard(
        &self,
        ctx: &SessionContext,
        keys: &[CartItemKey],
    ) -> Result<Vec<CartLine>, MultiCartError> {
        let mut discarded = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(line) = self.carts.remove_line(&ctx.session_id, key).await? {
                discarded.push(line);
            }
        }
        Ok(discarded)
    }

    #[instrument(skip(self))]
    pub async fn list(&self, owner_id: &OwnerId) -> Result<Vec<SavedCart>, MultiCartError> {
        let mut carts: Vec<SavedCart> = self
            .saved
            .list()
            .await?
            .into_iter()
            .filter(|cart| &cart.key.owner_id == owner_id)
            .collect();
        carts.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(carts)
    }

    /// Removes one line from a saved cart, releasing its hold. Returns `None` when no line
    /// matched.
    #[instrument(skip(self))]
    pub async fn remove_saved_line(
        &self,
        ctx: &SessionContext,
        name: &str,
        product_id: &ProductId,
        variant_id: Option<&VariantId>,
    ) -> Result<Option<CartLine>, MultiCartError> {
        let line_key = CartItemKey::new(product_id, variant_id);
        Ok(self.saved.remove_line(&ctx.key(name), &line_key).await?)
    }

    /// Destroys the loaded saved cart after its lines were checked out.
    ///
    /// The checked-out claims were transferred to the order, so releasing them is a no-op.
    #[instrument(skip(self))]
    pub async fn complete_order_for_loaded_cart(
        &self,
        ctx: &mut SessionContext,
    ) -> Result<(), MultiCartError> {
        let Some(key) = ctx.loaded_key() else {
            return Ok(());
        };
        match self.saved.delete(key.clone()).await {
            Ok(()) | Err(SavedCartError::NotFound(_)) => {}
            Err(e) => return Err(e.into()),
        }
        ctx.loaded_cart_name = None;
        info!(%key, "Loaded cart completed by checkout");
        Ok(())
    }

    async fn claims_of(&self, key: &SavedCartKey) -> Result<HashSet<ClaimId>, MultiCartError> {
        Ok(self
            .saved
            .get(key.clone())
            .await?
            .map(|cart| cart.lines.iter().map(|line| line.claim).collect())
            .unwrap_or_default())
    }

    async fn loaded_claims(&self, ctx: &SessionContext) -> Result<HashSet<ClaimId>, MultiCartError> {
        match ctx.loaded_key() {
            Some(key) => self.claims_of(&key).await,
            None => Ok(HashSet::new()),
        }
    }

    /// Re-issues claims for lines whose claim is in `shared`, holding their units again.
    /// Returns the lines to store and the re-issued ones.
    ///
    /// The extra units must be available; on failure every claim issued so far is released.
    async fn fork_shared(
        &self,
        lines: Vec<CartLine>,
        shared: &HashSet<ClaimId>,
    ) -> Result<(Vec<CartLine>, Vec<CartLine>), MultiCartError> {
        let mut stored = Vec::with_capacity(lines.len());
        let mut forked: Vec<CartLine> = Vec::new();
        for mut line in lines {
            if shared.contains(&line.claim) {
                line.claim = ClaimId::new();
                if line.held {
                    if let Err(e) = self
                        .ledger
                        .try_set_hold(&line.product_id, line.claim, line.units())
                        .await
                    {
                        for issued in &forked {
                            self.ledger.release_hold(&issued.product_id, issued.claim).await?;
                        }
                        return Err(e.into());
                    }
                }
                forked.push(line.clone());
            }
            stored.push(line);
        }
        Ok((stored, forked))
    }
}
