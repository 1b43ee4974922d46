//! # External Inventory Gateway
//!
//! Read-through access to the inventory system's authoritative sellable quantity, and
//! create/update of the external order that mirrors a local one. No state is kept here.
//!
//! - [`HttpInventoryGateway`] talks to the real API over HTTPS
//! - [`InMemoryGateway`] stands in for it in tests and the demo binary

mod error;
mod http;
mod memory;

pub use error::*;
pub use http::*;
pub use memory::*;

use crate::model::{Destination, ExternalStatus, Order, Sku};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Operations the engine needs from the external inventory system.
#[async_trait]
pub trait InventoryGateway: Send + Sync {
    /// Current sellable quantity of `sku` across the configured facility.
    async fn sellable_quantity(&self, sku: &Sku) -> Result<u32, GatewayError>;

    async fn create_order(&self, request: &ExternalOrderRequest) -> Result<ExternalOrder, GatewayError>;

    async fn update_order(
        &self,
        external_id: &str,
        request: &ExternalOrderRequest,
    ) -> Result<ExternalOrder, GatewayError>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalLineItem {
    pub sku: Sku,
    /// Base units: cases are expanded by their pack size.
    pub quantity: u32,
    pub unit_price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_price: Option<f64>,
}

/// Body of an external order create or update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalOrderRequest {
    /// The local order id, used by the inventory system as its reference.
    pub reference: String,
    pub status: ExternalStatus,
    pub destination: Destination,
    pub line_items: Vec<ExternalLineItem>,
}

impl ExternalOrderRequest {
    /// Builds the payload for `order`. Lines without a SKU are not known to the inventory
    /// system and are left out.
    pub fn from_order(order: &Order, status: ExternalStatus) -> Self {
        Self {
            reference: order.id.to_string(),
            status,
            destination: order.destination.clone(),
            line_items: order
                .lines
                .iter()
                .filter_map(|line| {
                    Some(ExternalLineItem {
                        sku: line.sku.clone()?,
                        quantity: line.reserved_qty,
                        unit_price: line.unit_price,
                        discount_price: line.discount_price,
                    })
                })
                .collect(),
        }
    }
}

/// An order as the inventory system reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalOrder {
    pub id: String,
    pub status: ExternalStatus,
}
