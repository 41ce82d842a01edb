//! Stock reservation with compensation.
//!
//! Reservation walks the cart lines in order, decrementing each line's
//! stock through the inventory store's atomic conditional decrement. When
//! a line in the middle fails, every line reserved before it is restored
//! in reverse order and the original failure is surfaced.
//!
//! A restore that itself fails is a [`CheckoutError::CompensationFailure`]:
//! stock has leaked and the error names exactly which lines, so an
//! operator can reconcile.

use common::{ProductId, SizeId};
use domain::CartLine;
use serde::{Deserialize, Serialize};
use store::{InventoryStore, ReserveOutcome};

use crate::error::{CheckoutError, Result};

/// A cart line whose stock has been decremented.
///
/// Reservation hands these out and release consumes them, so a given
/// reservation can only be given back once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservedLine {
    /// Product whose variant was decremented.
    pub product_id: ProductId,
    /// Size variant that was decremented.
    pub size_id: SizeId,
    /// Units taken from stock.
    pub quantity: u32,
}

/// Reserves and releases stock for checkout attempts.
pub struct StockReservationService<I: InventoryStore> {
    inventory: I,
}

impl<I: InventoryStore> StockReservationService<I> {
    /// Creates a new reservation service on top of an inventory store.
    pub fn new(inventory: I) -> Self {
        Self { inventory }
    }

    /// Validates every cart line against the current catalog.
    ///
    /// This is an advisory precheck: it rejects lines that cannot possibly
    /// succeed (missing or unpurchasable products, missing variants,
    /// requests beyond the last observed stock) without touching any row.
    /// The atomic decrement in [`reserve`](Self::reserve) remains the
    /// authoritative stock check.
    #[tracing::instrument(skip(self, lines), fields(line_count = lines.len()))]
    pub async fn prevalidate(&self, lines: &[CartLine]) -> Result<()> {
        for line in lines {
            let product = self
                .inventory
                .get_product(line.product_id)
                .await?
                .ok_or(CheckoutError::ProductNotFound(line.product_id))?;

            if !product.status.is_active() {
                return Err(CheckoutError::ProductNotPurchasable(line.product_id));
            }

            let variant = self
                .inventory
                .get_variant(line.product_id, line.size_id)
                .await?
                .ok_or(CheckoutError::VariantNotFound {
                    product_id: line.product_id,
                    size_id: line.size_id,
                })?;

            if !variant.is_available || line.quantity > variant.quantity {
                return Err(CheckoutError::InsufficientStock {
                    product_id: line.product_id,
                    size_id: line.size_id,
                    requested: line.quantity,
                    available: variant.quantity,
                });
            }
        }
        Ok(())
    }

    /// Reserves stock for every cart line, in cart order.
    ///
    /// On failure at line `k`, lines `0..k` are restored in reverse order
    /// and the line-`k` failure is returned. Returns the reserved lines on
    /// success; the caller owns them until it either persists the order or
    /// passes them back to [`release`](Self::release).
    #[tracing::instrument(skip(self, lines), fields(line_count = lines.len()))]
    pub async fn reserve(&self, lines: &[CartLine]) -> Result<Vec<ReservedLine>> {
        let mut reserved: Vec<ReservedLine> = Vec::with_capacity(lines.len());

        for line in lines {
            let failure = match self
                .inventory
                .reserve_stock(line.product_id, line.size_id, line.quantity)
                .await
            {
                Ok(ReserveOutcome::Reserved) => {
                    reserved.push(ReservedLine {
                        product_id: line.product_id,
                        size_id: line.size_id,
                        quantity: line.quantity,
                    });
                    continue;
                }
                Ok(ReserveOutcome::InsufficientStock { available }) => {
                    CheckoutError::InsufficientStock {
                        product_id: line.product_id,
                        size_id: line.size_id,
                        requested: line.quantity,
                        available,
                    }
                }
                Ok(ReserveOutcome::VariantNotFound) => CheckoutError::VariantNotFound {
                    product_id: line.product_id,
                    size_id: line.size_id,
                },
                Err(e) => CheckoutError::Store(e),
            };

            tracing::warn!(
                product_id = %line.product_id,
                size_id = %line.size_id,
                quantity = line.quantity,
                error = %failure,
                "stock reservation failed, restoring prior lines"
            );
            self.release(reserved).await?;
            return Err(failure);
        }

        Ok(reserved)
    }

    /// Restores previously reserved stock, in reverse reservation order.
    ///
    /// Consumes the reserved lines so a reservation cannot be released
    /// twice. If a restore fails, the remaining lines (the failed one
    /// included) are reported as unrestored.
    #[tracing::instrument(skip(self, lines), fields(line_count = lines.len()))]
    pub async fn release(&self, mut lines: Vec<ReservedLine>) -> Result<()> {
        while let Some(line) = lines.pop() {
            if let Err(e) = self
                .inventory
                .restore_stock(line.product_id, line.size_id, line.quantity)
                .await
            {
                let mut unrestored = vec![line];
                unrestored.extend(lines.into_iter().rev());
                tracing::error!(
                    product_id = %line.product_id,
                    size_id = %line.size_id,
                    quantity = line.quantity,
                    unrestored_lines = unrestored.len(),
                    error = %e,
                    "stock restore failed, reserved units leaked"
                );
                metrics::counter!("checkout_compensation_failures_total").increment(1);
                return Err(CheckoutError::CompensationFailure {
                    reason: e.to_string(),
                    unrestored,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{Money, Product, ProductStatus, ProductVariant};
    use store::InMemoryInventoryStore;

    async fn seed(inventory: &InMemoryInventoryStore, quantity: u32) -> (ProductId, SizeId) {
        let product_id = ProductId::new();
        let size_id = SizeId::new();
        inventory
            .put_product(Product::new(
                product_id,
                "Basic Tee",
                "basic-tee",
                Money::from_cents(1999),
                ProductStatus::Active,
                vec![ProductVariant::new(size_id, "M", "Size M", quantity)],
            ))
            .await
            .unwrap();
        (product_id, size_id)
    }

    #[tokio::test]
    async fn test_reserve_decrements_each_line() {
        let inventory = InMemoryInventoryStore::new();
        let (p1, s1) = seed(&inventory, 5).await;
        let (p2, s2) = seed(&inventory, 3).await;
        let service = StockReservationService::new(inventory.clone());

        let lines = vec![CartLine::new(p1, s1, 2), CartLine::new(p2, s2, 3)];
        let reserved = service.reserve(&lines).await.unwrap();

        assert_eq!(reserved.len(), 2);
        assert_eq!(inventory.quantity(p1, s1).await, Some(3));
        assert_eq!(inventory.quantity(p2, s2).await, Some(0));
    }

    #[tokio::test]
    async fn test_mid_sequence_failure_restores_prior_lines() {
        let inventory = InMemoryInventoryStore::new();
        let (p1, s1) = seed(&inventory, 5).await;
        let (p2, s2) = seed(&inventory, 1).await;
        let service = StockReservationService::new(inventory.clone());

        let lines = vec![CartLine::new(p1, s1, 2), CartLine::new(p2, s2, 4)];
        let err = service.reserve(&lines).await.unwrap_err();

        assert!(matches!(
            err,
            CheckoutError::InsufficientStock {
                requested: 4,
                available: 1,
                ..
            }
        ));
        // Line 1 was restored, line 2 never reserved
        assert_eq!(inventory.quantity(p1, s1).await, Some(5));
        assert_eq!(inventory.quantity(p2, s2).await, Some(1));
    }

    #[tokio::test]
    async fn test_release_restores_in_reverse_order() {
        let inventory = InMemoryInventoryStore::new();
        let (p1, s1) = seed(&inventory, 5).await;
        let service = StockReservationService::new(inventory.clone());

        let reserved = service
            .reserve(&[CartLine::new(p1, s1, 3)])
            .await
            .unwrap();
        service.release(reserved).await.unwrap();

        assert_eq!(inventory.quantity(p1, s1).await, Some(5));
    }

    #[tokio::test]
    async fn test_restore_failure_reports_unrestored_lines() {
        let inventory = InMemoryInventoryStore::new();
        let (p1, s1) = seed(&inventory, 5).await;
        let (p2, s2) = seed(&inventory, 5).await;
        let service = StockReservationService::new(inventory.clone());

        let reserved = service
            .reserve(&[CartLine::new(p1, s1, 1), CartLine::new(p2, s2, 1)])
            .await
            .unwrap();

        inventory.set_fail_on_restore(true).await;
        let err = service.release(reserved).await.unwrap_err();

        match err {
            CheckoutError::CompensationFailure { unrestored, .. } => {
                assert_eq!(unrestored.len(), 2);
            }
            other => panic!("expected CompensationFailure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_prevalidate_rejects_inactive_product() {
        let inventory = InMemoryInventoryStore::new();
        let product_id = ProductId::new();
        let size_id = SizeId::new();
        inventory
            .put_product(Product::new(
                product_id,
                "Old Tee",
                "old-tee",
                Money::from_cents(999),
                ProductStatus::Inactive,
                vec![ProductVariant::new(size_id, "M", "Size M", 5)],
            ))
            .await
            .unwrap();
        let service = StockReservationService::new(inventory);

        let err = service
            .prevalidate(&[CartLine::new(product_id, size_id, 1)])
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::ProductNotPurchasable(_)));
    }

    #[tokio::test]
    async fn test_prevalidate_rejects_unknown_product_and_variant() {
        let inventory = InMemoryInventoryStore::new();
        let (p1, s1) = seed(&inventory, 5).await;
        let service = StockReservationService::new(inventory);

        let err = service
            .prevalidate(&[CartLine::new(ProductId::new(), s1, 1)])
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::ProductNotFound(_)));

        let err = service
            .prevalidate(&[CartLine::new(p1, SizeId::new(), 1)])
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::VariantNotFound { .. }));
    }
}
