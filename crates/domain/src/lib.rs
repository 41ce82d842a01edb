//! Domain layer for the checkout system.
//!
//! This crate provides the core domain types:
//! - Catalog products with per-size stock variants
//! - Shopping cart with line-level invariants
//! - Order documents with immutable item snapshots
//! - Money, delivery, payment, and shipping-fee rules

pub mod cart;
pub mod catalog;
pub mod delivery;
pub mod money;
pub mod order;
pub mod payment;
pub mod pricing;

pub use cart::{Cart, CartError, CartLine, MAX_ITEMS, MAX_QUANTITY_PER_ITEM};
pub use catalog::{Product, ProductStatus, ProductVariant};
pub use delivery::{DeliveryAddress, DeliveryInfo};
pub use money::Money;
pub use order::{Order, OrderItem, OrderStatus};
pub use payment::{PaymentInfo, PaymentMethod, PaymentStatus};
