//! Catalog types: products and their size variants.
//!
//! The variant `quantity` field is the single source of truth for stock.
//! Reservation logic must treat concurrent writers as adversarial, so the
//! field is only ever mutated through the inventory store's atomic
//! conditional-decrement and restore primitives.

use common::{ProductId, SizeId};
use serde::{Deserialize, Serialize};

use crate::money::Money;

/// Lifecycle state of a catalog product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    /// Visible and purchasable.
    Active,
    /// Hidden from the storefront, not purchasable.
    Inactive,
    /// Being authored, not purchasable.
    #[default]
    Draft,
}

impl ProductStatus {
    /// Returns true if the product can be carted and ordered.
    pub fn is_active(&self) -> bool {
        matches!(self, ProductStatus::Active)
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductStatus::Active => "active",
            ProductStatus::Inactive => "inactive",
            ProductStatus::Draft => "draft",
        }
    }
}

impl std::fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ProductStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(ProductStatus::Active),
            "inactive" => Ok(ProductStatus::Inactive),
            "draft" => Ok(ProductStatus::Draft),
            other => Err(format!("unknown product status: {other}")),
        }
    }
}

/// A size variant of a product with its own stock counter.
///
/// `is_available` is derived state: true iff `quantity > 0` at the last
/// write. It is recomputed inside the same atomic write that changes
/// `quantity`, never separately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductVariant {
    /// The size this variant represents.
    pub size_id: SizeId,

    /// Short size code, e.g. "M".
    pub size_code: String,

    /// Human-readable size name, e.g. "Size M".
    pub size_name: String,

    /// Units in stock. Never negative.
    pub quantity: u32,

    /// Derived availability flag.
    pub is_available: bool,
}

impl ProductVariant {
    /// Creates a new variant, deriving availability from the quantity.
    pub fn new(
        size_id: SizeId,
        size_code: impl Into<String>,
        size_name: impl Into<String>,
        quantity: u32,
    ) -> Self {
        Self {
            size_id,
            size_code: size_code.into(),
            size_name: size_name.into(),
            quantity,
            is_available: quantity > 0,
        }
    }
}

/// A catalog product with per-size stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Product identifier.
    pub id: ProductId,

    /// Display name, snapshotted into orders at purchase time.
    pub name: String,

    /// URL slug, snapshotted into orders at purchase time.
    pub slug: String,

    /// Unit price shared by all variants.
    pub price: Money,

    /// Lifecycle state.
    pub status: ProductStatus,

    /// Stock per size, keyed by `size_id` (unique within a product).
    pub variants: Vec<ProductVariant>,
}

impl Product {
    /// Creates a new product.
    pub fn new(
        id: ProductId,
        name: impl Into<String>,
        slug: impl Into<String>,
        price: Money,
        status: ProductStatus,
        variants: Vec<ProductVariant>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            slug: slug.into(),
            price,
            status,
            variants,
        }
    }

    /// Returns the variant for a size, if the product carries it.
    pub fn variant(&self, size_id: SizeId) -> Option<&ProductVariant> {
        self.variants.iter().find(|v| v.size_id == size_id)
    }
}
