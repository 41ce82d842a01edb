//! Shopping cart with line-level invariants.

use common::{ProductId, SizeId, UserId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum quantity a single cart line may hold.
pub const MAX_QUANTITY_PER_ITEM: u32 = 30;

/// Maximum number of distinct lines a cart may hold.
pub const MAX_ITEMS: usize = 20;

/// Errors that can occur during cart operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CartError {
    /// Quantity outside the allowed range.
    #[error("Invalid quantity: {quantity} (must be between 1 and {MAX_QUANTITY_PER_ITEM})")]
    InvalidQuantity { quantity: u32 },

    /// The cart already holds the maximum number of distinct lines.
    #[error("Cart is full (max {MAX_ITEMS} items)")]
    CartFull,

    /// No line exists for the given product and size.
    #[error("Line not found for product {product_id} size {size_id}")]
    LineNotFound {
        product_id: ProductId,
        size_id: SizeId,
    },
}

/// One line of a cart: a product in a specific size.
///
/// Lines are unique per `(product_id, size_id)` within a cart; adding the
/// same pair again merges into the existing line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub size_id: SizeId,
    pub quantity: u32,
}

impl CartLine {
    /// Creates a new cart line.
    pub fn new(product_id: ProductId, size_id: SizeId, quantity: u32) -> Self {
        Self {
            product_id,
            size_id,
            quantity,
        }
    }
}

/// A user's shopping cart.
///
/// Created lazily on first add, mutated through the operations below, and
/// cleared (not deleted) once its content becomes an order. The invariant
/// `total_items == lines.len()` holds at every observable point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    /// Owning user; unique key for the cart.
    pub user_id: UserId,

    /// Ordered lines; insertion order is the reservation order at checkout.
    lines: Vec<CartLine>,

    /// Count of distinct lines.
    total_items: u32,
}

impl Cart {
    /// Creates an empty cart for a user.
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            lines: Vec::new(),
            total_items: 0,
        }
    }

    /// Returns the lines in insertion order.
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Returns the count of distinct lines.
    pub fn total_items(&self) -> u32 {
        self.total_items
    }

    /// Returns true if the cart has no lines.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Returns the line for a product/size pair, if present.
    pub fn line(&self, product_id: ProductId, size_id: SizeId) -> Option<&CartLine> {
        self.lines
            .iter()
            .find(|l| l.product_id == product_id && l.size_id == size_id)
    }

    /// Adds a line, merging with an existing line for the same product/size.
    ///
    /// The merged quantity must stay within [`MAX_QUANTITY_PER_ITEM`]; a new
    /// line must not push the cart past [`MAX_ITEMS`].
    pub fn add_line(
        &mut self,
        product_id: ProductId,
        size_id: SizeId,
        quantity: u32,
    ) -> Result<(), CartError> {
        validate_quantity(quantity)?;

        if let Some(existing) = self
            .lines
            .iter_mut()
            .find(|l| l.product_id == product_id && l.size_id == size_id)
        {
            let merged = existing.quantity + quantity;
            if merged > MAX_QUANTITY_PER_ITEM {
                return Err(CartError::InvalidQuantity { quantity: merged });
            }
            existing.quantity = merged;
            return Ok(());
        }

        if self.lines.len() >= MAX_ITEMS {
            return Err(CartError::CartFull);
        }

        self.lines.push(CartLine::new(product_id, size_id, quantity));
        self.total_items += 1;
        Ok(())
    }

    /// Sets the quantity of an existing line.
    pub fn update_line_quantity(
        &mut self,
        product_id: ProductId,
        size_id: SizeId,
        new_quantity: u32,
    ) -> Result<(), CartError> {
        validate_quantity(new_quantity)?;

        let line = self
            .lines
            .iter_mut()
            .find(|l| l.product_id == product_id && l.size_id == size_id)
            .ok_or(CartError::LineNotFound {
                product_id,
                size_id,
            })?;

        line.quantity = new_quantity;
        Ok(())
    }

    /// Removes a line.
    pub fn remove_line(&mut self, product_id: ProductId, size_id: SizeId) -> Result<(), CartError> {
        let before = self.lines.len();
        self.lines
            .retain(|l| !(l.product_id == product_id && l.size_id == size_id));

        if self.lines.len() == before {
            return Err(CartError::LineNotFound {
                product_id,
                size_id,
            });
        }

        self.total_items -= 1;
        Ok(())
    }

    /// Empties the cart, keeping the cart itself.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.total_items = 0;
    }
}

fn validate_quantity(quantity: u32) -> Result<(), CartError> {
    if quantity < 1 || quantity > MAX_QUANTITY_PER_ITEM {
        return Err(CartError::InvalidQuantity { quantity });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_line_tracks_total_items() {
        let mut cart = Cart::new(UserId::new());
        cart.add_line(ProductId::new(), SizeId::new(), 2).unwrap();
        cart.add_line(ProductId::new(), SizeId::new(), 1).unwrap();

        assert_eq!(cart.total_items(), 2);
        assert_eq!(cart.lines().len(), 2);
    }

    #[test]
    fn test_add_line_merges_same_product_and_size() {
        let mut cart = Cart::new(UserId::new());
        let product_id = ProductId::new();
        let size_id = SizeId::new();

        cart.add_line(product_id, size_id, 2).unwrap();
        cart.add_line(product_id, size_id, 3).unwrap();

        assert_eq!(cart.total_items(), 1);
        assert_eq!(cart.line(product_id, size_id).unwrap().quantity, 5);
    }

    #[test]
    fn test_merge_rejects_quantity_above_limit() {
        let mut cart = Cart::new(UserId::new());
        let product_id = ProductId::new();
        let size_id = SizeId::new();

        cart.add_line(product_id, size_id, 20).unwrap();
        let err = cart.add_line(product_id, size_id, 15).unwrap_err();

        assert_eq!(err, CartError::InvalidQuantity { quantity: 35 });
        // Failed merge leaves the line untouched
        assert_eq!(cart.line(product_id, size_id).unwrap().quantity, 20);
    }

    #[test]
    fn test_add_line_rejects_zero_and_oversized_quantity() {
        let mut cart = Cart::new(UserId::new());

        assert!(matches!(
            cart.add_line(ProductId::new(), SizeId::new(), 0),
            Err(CartError::InvalidQuantity { .. })
        ));
        assert!(matches!(
            cart.add_line(ProductId::new(), SizeId::new(), 31),
            Err(CartError::InvalidQuantity { .. })
        ));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_cart_rejects_too_many_lines() {
        let mut cart = Cart::new(UserId::new());
        for _ in 0..MAX_ITEMS {
            cart.add_line(ProductId::new(), SizeId::new(), 1).unwrap();
        }

        let err = cart.add_line(ProductId::new(), SizeId::new(), 1).unwrap_err();
        assert_eq!(err, CartError::CartFull);
        assert_eq!(cart.total_items() as usize, MAX_ITEMS);
    }

    #[test]
    fn test_update_line_quantity() {
        let mut cart = Cart::new(UserId::new());
        let product_id = ProductId::new();
        let size_id = SizeId::new();
        cart.add_line(product_id, size_id, 2).unwrap();

        cart.update_line_quantity(product_id, size_id, 7).unwrap();
        assert_eq!(cart.line(product_id, size_id).unwrap().quantity, 7);

        let err = cart
            .update_line_quantity(ProductId::new(), size_id, 1)
            .unwrap_err();
        assert!(matches!(err, CartError::LineNotFound { .. }));
    }

    #[test]
    fn test_remove_line() {
        let mut cart = Cart::new(UserId::new());
        let product_id = ProductId::new();
        let size_id = SizeId::new();
        cart.add_line(product_id, size_id, 2).unwrap();

        cart.remove_line(product_id, size_id).unwrap();
        assert!(cart.is_empty());
        assert_eq!(cart.total_items(), 0);

        let err = cart.remove_line(product_id, size_id).unwrap_err();
        assert!(matches!(err, CartError::LineNotFound { .. }));
    }

    #[test]
    fn test_clear_keeps_cart_but_drops_lines() {
        let mut cart = Cart::new(UserId::new());
        cart.add_line(ProductId::new(), SizeId::new(), 2).unwrap();
        cart.add_line(ProductId::new(), SizeId::new(), 1).unwrap();

        cart.clear();

        assert!(cart.is_empty());
        assert_eq!(cart.total_items(), 0);
    }

    #[test]
    fn test_cart_serialization_roundtrip() {
        let mut cart = Cart::new(UserId::new());
        cart.add_line(ProductId::new(), SizeId::new(), 2).unwrap();

        let json = serde_json::to_string(&cart).unwrap();
        let deserialized: Cart = serde_json::from_str(&json).unwrap();
        assert_eq!(cart, deserialized);
    }
}
