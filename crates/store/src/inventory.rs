//! Inventory store trait: catalog reads and atomic stock writes.
//!
//! The conditional decrement is the sole serialization point between
//! concurrent checkouts. Backends must perform the check-and-decrement as
//! one atomic operation against the underlying storage; the quantity field
//! is never mutated through read-modify-write at the application layer.

use async_trait::async_trait;
use common::{ProductId, SizeId};
use domain::{Money, Product, ProductStatus};

use crate::error::Result;

/// Catalog fields of a product, read for validation and order snapshots.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductSnapshot {
    pub name: String,
    pub slug: String,
    pub price: Money,
    pub status: ProductStatus,
}

/// Stock fields of a single size variant.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantSnapshot {
    pub size_code: String,
    pub size_name: String,
    pub quantity: u32,
    pub is_available: bool,
}

/// Outcome of a conditional stock decrement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReserveOutcome {
    /// The decrement was applied.
    Reserved,

    /// Current stock is below the requested quantity; nothing changed.
    InsufficientStock {
        /// Quantity observed by the failed conditional write.
        available: u32,
    },

    /// The product or size variant does not exist; nothing changed.
    VariantNotFound,
}

/// Trait for catalog and stock storage.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Loads catalog fields of a product.
    async fn get_product(&self, product_id: ProductId) -> Result<Option<ProductSnapshot>>;

    /// Loads the stock snapshot of one size variant.
    async fn get_variant(
        &self,
        product_id: ProductId,
        size_id: SizeId,
    ) -> Result<Option<VariantSnapshot>>;

    /// Atomically decrements a variant's quantity if enough stock exists.
    ///
    /// Decrements only when `current quantity >= quantity`, updating
    /// `is_available = (new quantity > 0)` in the same atomic write. No
    /// other fields are touched.
    async fn reserve_stock(
        &self,
        product_id: ProductId,
        size_id: SizeId,
        quantity: u32,
    ) -> Result<ReserveOutcome>;

    /// Atomically adds quantity back to a variant.
    ///
    /// The result is exactly `old + quantity` regardless of concurrent
    /// writers, and `is_available` is recomputed in the same write.
    async fn restore_stock(
        &self,
        product_id: ProductId,
        size_id: SizeId,
        quantity: u32,
    ) -> Result<()>;

    /// Inserts or replaces a product with its variants.
    async fn put_product(&self, product: Product) -> Result<()>;
}
