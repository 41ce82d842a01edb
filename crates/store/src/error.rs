use common::{ProductId, SizeId, UserId};
use domain::CartError;
use thiserror::Error;

/// Errors that can occur when interacting with the storage layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A cart invariant was violated while applying a mutation.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// No cart exists for the user.
    #[error("Cart not found for user {0}")]
    CartNotFound(UserId),

    /// A variant expected to exist was missing during a stock write.
    #[error("Variant not found for product {product_id} size {size_id}")]
    MissingVariant {
        product_id: ProductId,
        size_id: SizeId,
    },

    /// The backend refused or failed a write.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
