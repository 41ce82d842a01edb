//! Cart store trait.
//!
//! Mutations are atomic per cart: a backend applies the domain cart
//! operation and persists the result as one step, so two concurrent
//! mutations of the same cart cannot interleave.

use async_trait::async_trait;
use common::{ProductId, SizeId, UserId};
use domain::{Cart, CartLine};

use crate::error::Result;

/// Trait for cart storage.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Loads a user's cart. Returns `None` if the user never carted anything.
    async fn get_cart(&self, user_id: UserId) -> Result<Option<Cart>>;

    /// Adds a line to the user's cart, creating the cart on first use.
    ///
    /// Merges with an existing line for the same product/size. Returns the
    /// cart after the mutation.
    async fn add_line(&self, user_id: UserId, line: CartLine) -> Result<Cart>;

    /// Sets the quantity of an existing line.
    async fn update_line_quantity(
        &self,
        user_id: UserId,
        product_id: ProductId,
        size_id: SizeId,
        new_quantity: u32,
    ) -> Result<Cart>;

    /// Removes a line.
    async fn remove_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
        size_id: SizeId,
    ) -> Result<Cart>;

    /// Empties the cart's lines, keeping the cart itself. No-op if absent.
    async fn clear_cart(&self, user_id: UserId) -> Result<()>;
}
