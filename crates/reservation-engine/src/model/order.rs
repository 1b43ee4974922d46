//! Placed orders and their line reservations.
//!
//! # Actor Framework
//! [`Order`] implements [`ActorEntity`](actor_framework::ActorEntity) keyed by the host
//! platform's [`OrderId`]. Creation converts each line's cart hold into a reservation; see
//! [`OrderAction`](crate::order_actor::OrderAction) for cancellation, external status
//! observation and sync bookkeeping.

use crate::model::{ClaimId, ProductId, Sku, VariantId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Type-safe identifier for Orders.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrderId(pub u64);

impl From<u64> for OrderId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "order_{}", self.0)
    }
}

/// Local order status on the host platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Draft,
    Processing,
    OnHold,
    Fulfilled,
    Cancelled,
}

/// Order status as reported by the external inventory system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ExternalStatus {
    Created,
    Allocated,
    Picked,
    Packed,
    Shipped,
    Delivered,
    Cancelled,
    Unknown(String),
}

impl ExternalStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Created => "Created",
            Self::Allocated => "Allocated",
            Self::Picked => "Picked",
            Self::Packed => "Packed",
            Self::Shipped => "Shipped",
            Self::Delivered => "Delivered",
            Self::Cancelled => "Cancelled",
            Self::Unknown(raw) => raw,
        }
    }

    /// The external system has started fulfilling the order.
    pub fn is_advanced(&self) -> bool {
        matches!(
            self,
            Self::Allocated | Self::Picked | Self::Packed | Self::Shipped | Self::Delivered
        )
    }
}

impl From<String> for ExternalStatus {
    fn from(raw: String) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "created" => Self::Created,
            "allocated" => Self::Allocated,
            "picked" => Self::Picked,
            "packed" => Self::Packed,
            "shipped" => Self::Shipped,
            "delivered" => Self::Delivered,
            "cancelled" | "canceled" => Self::Cancelled,
            _ => Self::Unknown(raw),
        }
    }
}

impl From<ExternalStatus> for String {
    fn from(status: ExternalStatus) -> Self {
        status.as_str().to_string()
    }
}

impl Display for ExternalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shipping destination sent with the external order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Destination {
    pub name: String,
    pub address1: String,
    pub address2: Option<String>,
    pub city: String,
    pub state: String,
    pub postcode: String,
    pub country: String,
    pub email: String,
    pub phone: Option<String>,
}

impl Destination {
    /// Names of required fields that are blank.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("name", &self.name),
            ("address1", &self.address1),
            ("city", &self.city),
            ("postcode", &self.postcode),
            ("country", &self.country),
            ("email", &self.email),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| field)
        .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub line_id: u32,
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub sku: Option<Sku>,
    pub quantity: u32,
    pub pack_size: u32,
    /// `quantity × pack_size`, recorded so reversal never recomputes it.
    pub reserved_qty: u32,
    pub unit_price: f64,
    pub discount_price: Option<f64>,
    /// The cart hold this line was converted from, if any.
    pub hold_claim: Option<ClaimId>,
    pub reservation_claim: ClaimId,
    pub backorder: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderNote {
    pub at: DateTime<Utc>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub lines: Vec<OrderLine>,
    pub destination: Destination,
    pub status: OrderStatus,
    /// Identifier assigned by the external system; set once the first sync succeeds.
    pub external_id: Option<String>,
    pub external_status: Option<ExternalStatus>,
    /// Reservations have been released (cancellation) or destroyed (fulfilment).
    pub stock_adjusted: bool,
    pub notes: Vec<OrderNote>,
}

impl Order {
    /// Products whose reserved stock this order contributes to.
    pub fn reserved_products(&self) -> Vec<ProductId> {
        let mut products: Vec<ProductId> = self
            .lines
            .iter()
            .filter(|line| !line.backorder)
            .map(|line| line.product_id.clone())
            .collect();
        products.sort();
        products.dedup();
        products
    }

    /// Every product on the order, backorder lines included.
    pub fn products(&self) -> Vec<ProductId> {
        let mut products: Vec<ProductId> =
            self.lines.iter().map(|line| line.product_id.clone()).collect();
        products.sort();
        products.dedup();
        products
    }
}

/// One line of a checkout, usually built from a cart line.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderLineInput {
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub sku: Option<Sku>,
    pub quantity: u32,
    pub pack_size: u32,
    pub unit_price: f64,
    pub discount_price: Option<f64>,
    pub hold_claim: Option<ClaimId>,
    pub backorder: bool,
}

/// Payload for creating a new order.
#[derive(Debug, Clone)]
pub struct OrderCreate {
    pub lines: Vec<OrderLineInput>,
    pub destination: Destination,
    pub status: OrderStatus,
}

#[derive(Debug, Clone)]
pub struct OrderUpdate {
    pub destination: Option<Destination>,
    /// Cancellation goes through `OrderAction::Cancel`, never through an update.
    pub status: Option<OrderStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_external_status_parsing() {
        assert_eq!(ExternalStatus::from("created".to_string()), ExternalStatus::Created);
        assert_eq!(ExternalStatus::from("Canceled".to_string()), ExternalStatus::Cancelled);
        assert_eq!(
            ExternalStatus::from("backordered".to_string()),
            ExternalStatus::Unknown("backordered".into())
        );
        assert!(ExternalStatus::Shipped.is_advanced());
        assert!(!ExternalStatus::Created.is_advanced());
        assert!(!ExternalStatus::Cancelled.is_advanced());
    }

    #[test]
    fn test_external_status_serde_is_plain_string() {
        let json = serde_json::to_string(&ExternalStatus::Allocated).unwrap();
        assert_eq!(json, "\"Allocated\"");
        let back: ExternalStatus = serde_json::from_str("\"Delivered\"").unwrap();
        assert_eq!(back, ExternalStatus::Delivered);
    }

    #[test]
    fn test_missing_destination_fields() {
        let destination = Destination {
            name: "Ada".into(),
            city: "London".into(),
            ..Default::default()
        };
        assert_eq!(
            destination.missing_fields(),
            vec!["address1", "postcode", "country", "email"]
        );
    }
}
