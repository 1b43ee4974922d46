//! Typed catalog lookups populated at catalog-sync time.
//!
//! Reservation code never inspects product metadata directly; it asks the catalog for a
//! product's SKU, price and backorder flag, and for a variant's pack size.

use crate::model::{ProductId, Sku, VariantId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub sku: Sku,
    pub unit_price: f64,
    /// Stock-managed with unlimited backorders: exempt from every hold and reservation.
    pub backorders: bool,
}

impl CatalogEntry {
    pub fn new(sku: impl Into<String>, unit_price: f64) -> Self {
        Self {
            sku: Sku(sku.into()),
            unit_price,
            backorders: false,
        }
    }

    pub fn with_backorders(mut self) -> Self {
        self.backorders = true;
        self
    }
}

#[derive(Debug, Default)]
struct CatalogTables {
    products: HashMap<ProductId, CatalogEntry>,
    pack_sizes: HashMap<(ProductId, VariantId), u32>,
    by_sku: HashMap<Sku, ProductId>,
}

/// Shared, read-mostly catalog. Writers are the catalog sync; readers are every controller.
#[derive(Debug, Default)]
pub struct Catalog {
    tables: RwLock<CatalogTables>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_product(&self, product_id: ProductId, entry: CatalogEntry) {
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        tables.by_sku.insert(entry.sku.clone(), product_id.clone());
        tables.products.insert(product_id, entry);
    }

    /// Records the case quantity of a variant. Values below 1 are stored as 1.
    pub fn register_variant(&self, product_id: ProductId, variant_id: VariantId, pack_size: u32) {
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        tables
            .pack_sizes
            .insert((product_id, variant_id), pack_size.max(1));
    }

    pub fn entry(&self, product_id: &ProductId) -> Option<CatalogEntry> {
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        tables.products.get(product_id).cloned()
    }

    pub fn product_for_sku(&self, sku: &Sku) -> Option<ProductId> {
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        tables.by_sku.get(sku).cloned()
    }

    /// Multiplier from "number of cases" to base units. Simple lines and unknown variants are 1.
    pub fn pack_size(&self, product_id: &ProductId, variant_id: Option<&VariantId>) -> u32 {
        let Some(variant_id) = variant_id else {
            return 1;
        };
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        tables
            .pack_sizes
            .get(&(product_id.clone(), variant_id.clone()))
            .copied()
            .unwrap_or(1)
    }

    /// Unknown products are treated as stock-managed.
    pub fn is_backorder(&self, product_id: &ProductId) -> bool {
        self.entry(product_id).is_some_and(|entry| entry.backorders)
    }
}
