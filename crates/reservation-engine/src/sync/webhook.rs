//! Signed push notifications from the inventory system.
//!
//! The body is `{ "resource_type": "...", "data": ... }`, signed with HMAC-SHA256 over the raw
//! bytes and sent hex-encoded (optionally prefixed with `sha256=`).

use super::{OrderSyncCoordinator, SyncError};
use crate::clients::LedgerClient;
use crate::ledger_actor::LedgerError;
use crate::model::{Catalog, ExternalStatus, OrderId, ProductId, Sku};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::Value;
use sha2::Sha256;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum WebhookError {
    /// No shared secret is configured, so nothing can be verified.
    #[error("Webhook secret is not configured")]
    NotConfigured,

    #[error("Missing signature")]
    MissingSignature,

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Malformed notification: {0}")]
    Malformed(String),

    #[error(transparent)]
    Sync(#[from] SyncError),
}

impl From<LedgerError> for WebhookError {
    fn from(e: LedgerError) -> Self {
        WebhookError::Sync(e.into())
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "resource_type", content = "data", rename_all = "snake_case")]
enum Notification {
    Item(Value),
    InventorySummary(Value),
    Order(OrderPayload),
    RetailOrder(OrderPayload),
}

#[derive(Debug, Deserialize)]
struct OrderPayload {
    id: String,
    status: ExternalStatus,
}

#[derive(Debug, Deserialize)]
struct SummaryEntry {
    sku: Sku,
    sellable_qty: i64,
}

/// What a delivery changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// Products whose external quantity was refreshed, and entries that were skipped.
    Inventory {
        refreshed: Vec<ProductId>,
        skipped: usize,
    },
    /// The local order the status was applied to, if one matched.
    Order(Option<OrderId>),
    /// Acknowledged without action.
    Ignored,
}

/// Computes the hex HMAC-SHA256 of `body`, as the inventory system sends it.
pub fn sign(secret: &[u8], body: &[u8]) -> String {
    // HMAC takes keys of any length.
    let mut mac = match HmacSha256::new_from_slice(secret) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

#[derive(Clone)]
pub struct WebhookHandler {
    secret: Vec<u8>,
    catalog: Arc<Catalog>,
    ledger: LedgerClient,
    coordinator: OrderSyncCoordinator,
}

impl WebhookHandler {
    pub fn new(
        secret: impl Into<Vec<u8>>,
        catalog: Arc<Catalog>,
        ledger: LedgerClient,
        coordinator: OrderSyncCoordinator,
    ) -> Self {
        Self {
            secret: secret.into(),
            catalog,
            ledger,
            coordinator,
        }
    }

    fn verify(&self, body: &[u8], signature: Option<&str>) -> Result<(), WebhookError> {
        if self.secret.is_empty() {
            return Err(WebhookError::NotConfigured);
        }
        let signature = signature
            .map(str::trim)
            .filter(|signature| !signature.is_empty())
            .ok_or(WebhookError::MissingSignature)?;
        let signature = signature.strip_prefix("sha256=").unwrap_or(signature);
        let expected = hex::decode(signature).map_err(|_| WebhookError::InvalidSignature)?;

        let mut mac =
            HmacSha256::new_from_slice(&self.secret).map_err(|_| WebhookError::InvalidSignature)?;
        mac.update(body);
        mac.verify_slice(&expected)
            .map_err(|_| WebhookError::InvalidSignature)
    }

    /// Verifies and dispatches one delivery.
    #[instrument(skip(self, body, signature), fields(bytes = body.len()))]
    pub async fn handle(
        &self,
        body: &[u8],
        signature: Option<&str>,
    ) -> Result<WebhookOutcome, WebhookError> {
        self.verify(body, signature)?;
        let notification: Notification =
            serde_json::from_slice(body).map_err(|e| WebhookError::Malformed(e.to_string()))?;

        match notification {
            Notification::Item(_) => {
                debug!("Item notification acknowledged");
                Ok(WebhookOutcome::Ignored)
            }
            Notification::InventorySummary(data) => self.inventory_summary(data).await,
            Notification::Order(payload) | Notification::RetailOrder(payload) => {
                let order_id = self
                    .coordinator
                    .handle_external_status(&payload.id, payload.status)
                    .await?;
                Ok(WebhookOutcome::Order(order_id))
            }
        }
    }

    /// Refreshes each summarised SKU. Entries that do not parse, carry a negative quantity or
    /// name an unknown SKU are skipped, never treated as zero.
    async fn inventory_summary(&self, data: Value) -> Result<WebhookOutcome, WebhookError> {
        let entries = match data {
            Value::Array(entries) => entries,
            single @ Value::Object(_) => vec![single],
            other => return Err(WebhookError::Malformed(format!("unexpected data: {other}"))),
        };

        let mut refreshed = Vec::new();
        let mut skipped = 0;
        for raw in entries {
            let entry = match serde_json::from_value::<SummaryEntry>(raw) {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "Skipping malformed inventory entry");
                    skipped += 1;
                    continue;
                }
            };
            let Ok(sellable) = u32::try_from(entry.sellable_qty) else {
                warn!(sku = %entry.sku, sellable_qty = entry.sellable_qty, "Skipping out-of-range quantity");
                skipped += 1;
                continue;
            };
            let Some(product_id) = self.catalog.product_for_sku(&entry.sku) else {
                debug!(sku = %entry.sku, "SKU not in catalog");
                skipped += 1;
                continue;
            };

            let levels = self.ledger.refresh_external(&product_id, sellable).await?;
            info!(%product_id, sku = %entry.sku, sellable, display = levels.display, "Inventory summary applied");
            refreshed.push(product_id);
        }
        Ok(WebhookOutcome::Inventory { refreshed, skipped })
    }
}
