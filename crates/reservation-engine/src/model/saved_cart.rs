//! Named cart snapshots owned by a user.
//!
//! # Actor Framework
//! [`SavedCart`] implements [`ActorEntity`](actor_framework::ActorEntity) keyed by
//! [`SavedCartKey`] (owner + name), which makes "name unique per owner" the actor's own
//! `AlreadyExists` check. Lines keep their `expires_at` and claim, so a saved line still
//! holds stock until it is swept, removed, or its cart is deleted.

use crate::model::{CartItemKey, CartLine};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Type-safe identifier for storefront customers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OwnerId(pub u64);

impl From<u64> for OwnerId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl Display for OwnerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "user_{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SavedCartKey {
    pub owner_id: OwnerId,
    pub name: String,
}

impl SavedCartKey {
    pub fn new(owner_id: OwnerId, name: impl Into<String>) -> Self {
        Self {
            owner_id,
            name: name.into(),
        }
    }
}

impl Display for SavedCartKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner_id, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedCart {
    pub key: SavedCartKey,
    pub lines: Vec<CartLine>,
    pub saved_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SavedCart {
    pub fn name(&self) -> &str {
        &self.key.name
    }

    pub fn line(&self, key: &CartItemKey) -> Option<&CartLine> {
        self.lines.iter().find(|line| &line.key == key)
    }
}

/// Payload for saving the active cart under a new name.
#[derive(Debug, Clone)]
pub struct SavedCartCreate {
    pub lines: Vec<CartLine>,
    pub saved_at: DateTime<Utc>,
}
