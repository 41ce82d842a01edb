//! Checkout error types.

use common::{ProductId, SizeId, UserId};
use store::StoreError;
use thiserror::Error;

use crate::reservation::ReservedLine;

/// Errors that can occur while placing an order.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Request failed validation before any side effect.
    #[error("Invalid request: {0}")]
    Validation(String),

    /// The purchasing user does not exist.
    #[error("User {0} not found")]
    UserNotFound(UserId),

    /// The user's cart is empty or missing.
    #[error("Cart is empty")]
    EmptyCart,

    /// A carted product no longer exists.
    #[error("Product {0} not found")]
    ProductNotFound(ProductId),

    /// A carted product exists but is not purchasable.
    #[error("Product {0} is not available for purchase")]
    ProductNotPurchasable(ProductId),

    /// A carted size variant no longer exists on its product.
    #[error("Size {size_id} not found on product {product_id}")]
    VariantNotFound {
        product_id: ProductId,
        size_id: SizeId,
    },

    /// Stock ran out for one of the cart lines.
    #[error(
        "Insufficient stock for product {product_id} size {size_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        product_id: ProductId,
        size_id: SizeId,
        requested: u32,
        available: u32,
    },

    /// An idempotency key was replayed with a different request payload.
    #[error("Idempotency key '{key}' was already used with a different request")]
    IdempotencyConflict { key: String },

    /// The checkout deadline passed before the pipeline finished.
    #[error("Checkout deadline exceeded")]
    DeadlineExceeded,

    /// Stock could not be restored after a failed attempt.
    ///
    /// The lines in `unrestored` were decremented but not given back;
    /// they need operator attention.
    #[error("Failed to restore reserved stock: {reason}")]
    CompensationFailure {
        reason: String,
        unrestored: Vec<ReservedLine>,
    },

    /// Storage error.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl CheckoutError {
    /// Returns a stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            CheckoutError::Validation(_) => "VALIDATION",
            CheckoutError::UserNotFound(_) => "USER_NOT_FOUND",
            CheckoutError::EmptyCart => "EMPTY_CART",
            CheckoutError::ProductNotFound(_) => "PRODUCT_NOT_FOUND",
            CheckoutError::ProductNotPurchasable(_) => "PRODUCT_NOT_PURCHASABLE",
            CheckoutError::VariantNotFound { .. } => "VARIANT_NOT_FOUND",
            CheckoutError::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            CheckoutError::IdempotencyConflict { .. } => "IDEMPOTENCY_CONFLICT",
            CheckoutError::DeadlineExceeded => "DEADLINE_EXCEEDED",
            CheckoutError::CompensationFailure { .. } => "COMPENSATION_FAILURE",
            CheckoutError::Store(_) => "STORE",
        }
    }
}

/// Result type for checkout operations.
pub type Result<T> = std::result::Result<T, CheckoutError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_stable() {
        assert_eq!(CheckoutError::EmptyCart.code(), "EMPTY_CART");
        assert_eq!(
            CheckoutError::InsufficientStock {
                product_id: ProductId::new(),
                size_id: SizeId::new(),
                requested: 3,
                available: 1,
            }
            .code(),
            "INSUFFICIENT_STOCK"
        );
        assert_eq!(CheckoutError::DeadlineExceeded.code(), "DEADLINE_EXCEEDED");
    }

    #[test]
    fn test_insufficient_stock_message_carries_counts() {
        let err = CheckoutError::InsufficientStock {
            product_id: ProductId::new(),
            size_id: SizeId::new(),
            requested: 10,
            available: 5,
        };
        let msg = err.to_string();
        assert!(msg.contains("requested 10"));
        assert!(msg.contains("available 5"));
    }
}
