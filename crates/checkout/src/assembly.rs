//! Order assembly.
//!
//! Turns reserved cart lines into an order document. Every item carries a
//! snapshot of the product and variant as they were at purchase time, so
//! later catalog edits never rewrite order history.

use domain::{DeliveryInfo, Order, OrderItem, PaymentMethod};
use store::{InventoryStore, OrderStore, UserRecord};

use crate::error::{CheckoutError, Result};
use crate::reservation::ReservedLine;

/// Builds and persists orders from reserved stock.
pub struct OrderAssembler<I, O>
where
    I: InventoryStore,
    O: OrderStore,
{
    inventory: I,
    orders: O,
}

impl<I, O> OrderAssembler<I, O>
where
    I: InventoryStore,
    O: OrderStore,
{
    /// Creates a new order assembler.
    pub fn new(inventory: I, orders: O) -> Self {
        Self { inventory, orders }
    }

    /// Snapshots the reserved lines into order items, builds the order and
    /// writes it.
    ///
    /// The caller still owns the reserved stock: if this returns an error
    /// the order does not exist and the reservation must be released.
    #[tracing::instrument(skip(self, user, reserved, delivery), fields(user_id = %user.id, line_count = reserved.len()))]
    pub async fn assemble_and_persist(
        &self,
        user: &UserRecord,
        reserved: &[ReservedLine],
        delivery: DeliveryInfo,
        payment_method: PaymentMethod,
    ) -> Result<Order> {
        let mut items = Vec::with_capacity(reserved.len());

        for line in reserved {
            let product = self
                .inventory
                .get_product(line.product_id)
                .await?
                .ok_or(CheckoutError::ProductNotFound(line.product_id))?;

            let variant = self
                .inventory
                .get_variant(line.product_id, line.size_id)
                .await?
                .ok_or(CheckoutError::VariantNotFound {
                    product_id: line.product_id,
                    size_id: line.size_id,
                })?;

            items.push(OrderItem::snapshot(
                line.product_id,
                product.name,
                product.slug,
                product.price,
                line.size_id,
                variant.size_code,
                variant.size_name,
                line.quantity,
            ));
        }

        let order = Order::new(
            user.id,
            user.email.clone(),
            items,
            delivery,
            payment_method,
        );
        self.orders.insert_order(&order).await?;

        tracing::info!(order_id = %order.id, total_cents = order.total_amount.cents(), "order persisted");
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{ProductId, SizeId, UserId};
    use domain::{
        DeliveryAddress, Money, OrderStatus, Product, ProductStatus, ProductVariant,
    };
    use store::{InMemoryInventoryStore, InMemoryOrderStore};

    fn sample_delivery() -> DeliveryInfo {
        DeliveryInfo {
            receiver_name: "Alex Tran".to_string(),
            receiver_phone: "0900111222".to_string(),
            address: DeliveryAddress {
                province_code: 79,
                province_name: "Ho Chi Minh".to_string(),
                ward_code: 26734,
                ward_name: "Ward 4".to_string(),
                detail: None,
            },
            note: None,
        }
    }

    #[tokio::test]
    async fn test_assemble_snapshots_catalog_fields() {
        let inventory = InMemoryInventoryStore::new();
        let orders = InMemoryOrderStore::new();

        let product_id = ProductId::new();
        let size_id = SizeId::new();
        inventory
            .put_product(Product::new(
                product_id,
                "Basic Tee",
                "basic-tee",
                Money::from_cents(1000),
                ProductStatus::Active,
                vec![ProductVariant::new(size_id, "M", "Size M", 5)],
            ))
            .await
            .unwrap();

        let assembler = OrderAssembler::new(inventory, orders.clone());
        let user = UserRecord {
            id: UserId::new(),
            email: "alex@example.com".to_string(),
        };
        let reserved = vec![ReservedLine {
            product_id,
            size_id,
            quantity: 2,
        }];

        let order = assembler
            .assemble_and_persist(&user, &reserved, sample_delivery(), PaymentMethod::Cod)
            .await
            .unwrap();

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.items.len(), 1);
        let item = &order.items[0];
        assert_eq!(item.product_name, "Basic Tee");
        assert_eq!(item.size_code, "M");
        assert_eq!(item.total_price, Money::from_cents(2000));
        assert_eq!(order.subtotal, Money::from_cents(2000));

        let stored = orders.get_order(order.id).await.unwrap().unwrap();
        assert_eq!(stored, order);
    }

    #[tokio::test]
    async fn test_assemble_fails_when_product_vanished() {
        let inventory = InMemoryInventoryStore::new();
        let orders = InMemoryOrderStore::new();
        let assembler = OrderAssembler::new(inventory, orders.clone());

        let user = UserRecord {
            id: UserId::new(),
            email: "alex@example.com".to_string(),
        };
        let reserved = vec![ReservedLine {
            product_id: ProductId::new(),
            size_id: SizeId::new(),
            quantity: 1,
        }];

        let err = assembler
            .assemble_and_persist(&user, &reserved, sample_delivery(), PaymentMethod::Cod)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::ProductNotFound(_)));
        assert_eq!(orders.order_count().await, 0);
    }
}
