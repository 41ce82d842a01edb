//! In-memory store implementations.
//!
//! These back the default server state and the test suites, and provide
//! the same interface as the PostgreSQL implementations. Every mutation
//! runs inside a single write-lock critical section, which is what makes
//! the conditional decrement atomic with respect to concurrent checkouts.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{OrderId, ProductId, SizeId, UserId};
use domain::{Cart, CartLine, Order, OrderStatus, Product};
use tokio::sync::RwLock;

use crate::{
    IdempotencyRecord, ProductSnapshot, ReserveOutcome, StoreError, UserRecord, VariantSnapshot,
    cart::CartStore,
    error::Result,
    inventory::InventoryStore,
    order::OrderStore,
    user::UserDirectory,
};

/// In-memory inventory store.
#[derive(Clone, Default)]
pub struct InMemoryInventoryStore {
    products: Arc<RwLock<HashMap<ProductId, Product>>>,
    fail_on_restore: Arc<RwLock<bool>>,
}

impl InMemoryInventoryStore {
    /// Creates a new empty inventory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the store to fail restore calls (compensation testing).
    pub async fn set_fail_on_restore(&self, fail: bool) {
        *self.fail_on_restore.write().await = fail;
    }

    /// Returns the current stock quantity of a variant, for assertions.
    pub async fn quantity(&self, product_id: ProductId, size_id: SizeId) -> Option<u32> {
        let products = self.products.read().await;
        products
            .get(&product_id)
            .and_then(|p| p.variant(size_id))
            .map(|v| v.quantity)
    }
}

#[async_trait]
impl InventoryStore for InMemoryInventoryStore {
    async fn get_product(&self, product_id: ProductId) -> Result<Option<ProductSnapshot>> {
        let products = self.products.read().await;
        Ok(products.get(&product_id).map(|p| ProductSnapshot {
            name: p.name.clone(),
            slug: p.slug.clone(),
            price: p.price,
            status: p.status,
        }))
    }

    async fn get_variant(
        &self,
        product_id: ProductId,
        size_id: SizeId,
    ) -> Result<Option<VariantSnapshot>> {
        let products = self.products.read().await;
        Ok(products
            .get(&product_id)
            .and_then(|p| p.variant(size_id))
            .map(|v| VariantSnapshot {
                size_code: v.size_code.clone(),
                size_name: v.size_name.clone(),
                quantity: v.quantity,
                is_available: v.is_available,
            }))
    }

    async fn reserve_stock(
        &self,
        product_id: ProductId,
        size_id: SizeId,
        quantity: u32,
    ) -> Result<ReserveOutcome> {
        // Check and decrement under one write lock; this is the atomic
        // conditional update the whole pipeline relies on.
        let mut products = self.products.write().await;

        let Some(variant) = products
            .get_mut(&product_id)
            .and_then(|p| p.variants.iter_mut().find(|v| v.size_id == size_id))
        else {
            return Ok(ReserveOutcome::VariantNotFound);
        };

        if variant.quantity < quantity {
            return Ok(ReserveOutcome::InsufficientStock {
                available: variant.quantity,
            });
        }

        variant.quantity -= quantity;
        variant.is_available = variant.quantity > 0;
        Ok(ReserveOutcome::Reserved)
    }

    async fn restore_stock(
        &self,
        product_id: ProductId,
        size_id: SizeId,
        quantity: u32,
    ) -> Result<()> {
        if *self.fail_on_restore.read().await {
            return Err(StoreError::Unavailable(
                "injected restore failure".to_string(),
            ));
        }

        let mut products = self.products.write().await;

        let Some(variant) = products
            .get_mut(&product_id)
            .and_then(|p| p.variants.iter_mut().find(|v| v.size_id == size_id))
        else {
            return Err(StoreError::MissingVariant {
                product_id,
                size_id,
            });
        };

        variant.quantity += quantity;
        variant.is_available = variant.quantity > 0;
        Ok(())
    }

    async fn put_product(&self, product: Product) -> Result<()> {
        self.products.write().await.insert(product.id, product);
        Ok(())
    }
}

/// In-memory cart store.
#[derive(Clone, Default)]
pub struct InMemoryCartStore {
    carts: Arc<RwLock<HashMap<UserId, Cart>>>,
}

impl InMemoryCartStore {
    /// Creates a new empty cart store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CartStore for InMemoryCartStore {
    async fn get_cart(&self, user_id: UserId) -> Result<Option<Cart>> {
        Ok(self.carts.read().await.get(&user_id).cloned())
    }

    async fn add_line(&self, user_id: UserId, line: CartLine) -> Result<Cart> {
        let mut carts = self.carts.write().await;
        let cart = carts.entry(user_id).or_insert_with(|| Cart::new(user_id));
        cart.add_line(line.product_id, line.size_id, line.quantity)?;
        Ok(cart.clone())
    }

    async fn update_line_quantity(
        &self,
        user_id: UserId,
        product_id: ProductId,
        size_id: SizeId,
        new_quantity: u32,
    ) -> Result<Cart> {
        let mut carts = self.carts.write().await;
        let cart = carts
            .get_mut(&user_id)
            .ok_or(StoreError::CartNotFound(user_id))?;
        cart.update_line_quantity(product_id, size_id, new_quantity)?;
        Ok(cart.clone())
    }

    async fn remove_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
        size_id: SizeId,
    ) -> Result<Cart> {
        let mut carts = self.carts.write().await;
        let cart = carts
            .get_mut(&user_id)
            .ok_or(StoreError::CartNotFound(user_id))?;
        cart.remove_line(product_id, size_id)?;
        Ok(cart.clone())
    }

    async fn clear_cart(&self, user_id: UserId) -> Result<()> {
        if let Some(cart) = self.carts.write().await.get_mut(&user_id) {
            cart.clear();
        }
        Ok(())
    }
}

#[derive(Default)]
struct OrderStoreState {
    orders: HashMap<OrderId, Order>,
    insertion_order: Vec<OrderId>,
    idempotency: HashMap<String, IdempotencyRecord>,
    fail_on_insert: bool,
}

/// In-memory order store.
#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
    state: Arc<RwLock<OrderStoreState>>,
}

impl InMemoryOrderStore {
    /// Creates a new empty order store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the store to fail insert calls (compensation testing).
    pub async fn set_fail_on_insert(&self, fail: bool) {
        self.state.write().await.fail_on_insert = fail;
    }

    /// Returns the number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn insert_order(&self, order: &Order) -> Result<()> {
        let mut state = self.state.write().await;

        if state.fail_on_insert {
            return Err(StoreError::Unavailable(
                "injected insert failure".to_string(),
            ));
        }

        state.orders.insert(order.id, order.clone());
        state.insertion_order.push(order.id);
        Ok(())
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        let state = self.state.read().await;
        Ok(state
            .orders
            .get(&order_id)
            .filter(|o| !o.is_deleted)
            .cloned())
    }

    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        let state = self.state.read().await;
        Ok(state
            .insertion_order
            .iter()
            .rev()
            .filter_map(|id| state.orders.get(id))
            .filter(|o| o.user_id == user_id && !o.is_deleted)
            .cloned()
            .collect())
    }

    async fn list_by_status(&self, status: OrderStatus) -> Result<Vec<Order>> {
        let state = self.state.read().await;
        Ok(state
            .insertion_order
            .iter()
            .rev()
            .filter_map(|id| state.orders.get(id))
            .filter(|o| o.status == status && !o.is_deleted)
            .cloned()
            .collect())
    }

    async fn find_idempotency_key(&self, key: &str) -> Result<Option<IdempotencyRecord>> {
        Ok(self.state.read().await.idempotency.get(key).cloned())
    }

    async fn record_idempotency_key(
        &self,
        key: &str,
        record: IdempotencyRecord,
    ) -> Result<IdempotencyRecord> {
        // First writer wins, matching the database backend.
        let mut state = self.state.write().await;
        let stored = state.idempotency.entry(key.to_string()).or_insert(record);
        Ok(stored.clone())
    }

    async fn soft_delete_order(&self, order_id: OrderId) -> Result<()> {
        let mut state = self.state.write().await;
        if let Some(order) = state.orders.get_mut(&order_id) {
            order.is_deleted = true;
        }
        Ok(())
    }
}

/// In-memory user directory.
#[derive(Clone, Default)]
pub struct InMemoryUserDirectory {
    users: Arc<RwLock<HashMap<UserId, UserRecord>>>,
}

impl InMemoryUserDirectory {
    /// Creates a new empty user directory.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn get_user(&self, user_id: UserId) -> Result<Option<UserRecord>> {
        Ok(self.users.read().await.get(&user_id).cloned())
    }

    async fn put_user(&self, user: UserRecord) -> Result<()> {
        self.users.write().await.insert(user.id, user);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{Money, ProductStatus, ProductVariant};

    async fn seed_variant(store: &InMemoryInventoryStore, quantity: u32) -> (ProductId, SizeId) {
        let product_id = ProductId::new();
        let size_id = SizeId::new();
        store
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
    async fn test_reserve_decrements_and_updates_availability() {
        let store = InMemoryInventoryStore::new();
        let (product_id, size_id) = seed_variant(&store, 5).await;

        let outcome = store.reserve_stock(product_id, size_id, 5).await.unwrap();
        assert_eq!(outcome, ReserveOutcome::Reserved);

        let variant = store.get_variant(product_id, size_id).await.unwrap().unwrap();
        assert_eq!(variant.quantity, 0);
        assert!(!variant.is_available);
    }

    #[tokio::test]
    async fn test_reserve_insufficient_stock_leaves_quantity_untouched() {
        let store = InMemoryInventoryStore::new();
        let (product_id, size_id) = seed_variant(&store, 5).await;

        let outcome = store.reserve_stock(product_id, size_id, 10).await.unwrap();
        assert_eq!(outcome, ReserveOutcome::InsufficientStock { available: 5 });
        assert_eq!(store.quantity(product_id, size_id).await, Some(5));
    }

    #[tokio::test]
    async fn test_reserve_unknown_variant() {
        let store = InMemoryInventoryStore::new();
        let (product_id, _) = seed_variant(&store, 5).await;

        let outcome = store
            .reserve_stock(product_id, SizeId::new(), 1)
            .await
            .unwrap();
        assert_eq!(outcome, ReserveOutcome::VariantNotFound);

        let outcome = store
            .reserve_stock(ProductId::new(), SizeId::new(), 1)
            .await
            .unwrap();
        assert_eq!(outcome, ReserveOutcome::VariantNotFound);
    }

    #[tokio::test]
    async fn test_restore_adds_back_and_flips_availability() {
        let store = InMemoryInventoryStore::new();
        let (product_id, size_id) = seed_variant(&store, 2).await;

        store.reserve_stock(product_id, size_id, 2).await.unwrap();
        assert_eq!(store.quantity(product_id, size_id).await, Some(0));

        store.restore_stock(product_id, size_id, 2).await.unwrap();
        let variant = store.get_variant(product_id, size_id).await.unwrap().unwrap();
        assert_eq!(variant.quantity, 2);
        assert!(variant.is_available);
    }

    #[tokio::test]
    async fn test_concurrent_reserves_never_oversell() {
        let store = InMemoryInventoryStore::new();
        let (product_id, size_id) = seed_variant(&store, 5).await;

        // 10 tasks each want 1 unit of a stock of 5.
        let mut handles = Vec::new();
        for _ in 0..10 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.reserve_stock(product_id, size_id, 1).await.unwrap()
            }));
        }

        let mut succeeded = 0;
        for handle in handles {
            if handle.await.unwrap() == ReserveOutcome::Reserved {
                succeeded += 1;
            }
        }

        assert_eq!(succeeded, 5);
        assert_eq!(store.quantity(product_id, size_id).await, Some(0));
    }

    #[tokio::test]
    async fn test_cart_add_and_clear() {
        let store = InMemoryCartStore::new();
        let user_id = UserId::new();
        let line = CartLine::new(ProductId::new(), SizeId::new(), 2);

        assert!(store.get_cart(user_id).await.unwrap().is_none());

        let cart = store.add_line(user_id, line).await.unwrap();
        assert_eq!(cart.total_items(), 1);

        store.clear_cart(user_id).await.unwrap();
        let cart = store.get_cart(user_id).await.unwrap().unwrap();
        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn test_cart_update_and_remove_require_existing_cart() {
        let store = InMemoryCartStore::new();
        let user_id = UserId::new();

        let err = store
            .update_line_quantity(user_id, ProductId::new(), SizeId::new(), 2)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::CartNotFound(_)));

        let err = store
            .remove_line(user_id, ProductId::new(), SizeId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::CartNotFound(_)));
    }

    #[tokio::test]
    async fn test_order_insert_and_queries() {
        use domain::{DeliveryAddress, DeliveryInfo, OrderItem, PaymentMethod};

        let store = InMemoryOrderStore::new();
        let user_id = UserId::new();
        let delivery = DeliveryInfo {
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
        };
        let item = OrderItem::snapshot(
            ProductId::new(),
            "Basic Tee",
            "basic-tee",
            Money::from_cents(1000),
            SizeId::new(),
            "M",
            "Size M",
            2,
        );
        let order = Order::new(
            user_id,
            "alex@example.com",
            vec![item],
            delivery,
            PaymentMethod::Cod,
        );

        store.insert_order(&order).await.unwrap();

        let loaded = store.get_order(order.id).await.unwrap().unwrap();
        assert_eq!(loaded, order);
        assert_eq!(store.list_by_user(user_id).await.unwrap().len(), 1);
        assert_eq!(
            store.list_by_status(OrderStatus::Pending).await.unwrap().len(),
            1
        );
        assert!(store.list_by_status(OrderStatus::Paid).await.unwrap().is_empty());
        assert!(store.list_by_user(UserId::new()).await.unwrap().is_empty());

        store.soft_delete_order(order.id).await.unwrap();
        assert!(store.get_order(order.id).await.unwrap().is_none());
        assert!(store.list_by_user(user_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_idempotency_ledger() {
        let store = InMemoryOrderStore::new();
        let record = IdempotencyRecord {
            order_id: OrderId::new(),
            fingerprint: "abc".to_string(),
        };

        assert!(store.find_idempotency_key("k1").await.unwrap().is_none());

        let stored = store.record_idempotency_key("k1", record.clone()).await.unwrap();
        assert_eq!(stored, record);

        // A second writer loses and gets the first record back
        let rival = IdempotencyRecord {
            order_id: OrderId::new(),
            fingerprint: "def".to_string(),
        };
        let stored = store.record_idempotency_key("k1", rival).await.unwrap();
        assert_eq!(stored, record);
        assert_eq!(store.find_idempotency_key("k1").await.unwrap(), Some(record));
    }

    #[tokio::test]
    async fn test_user_directory() {
        let directory = InMemoryUserDirectory::new();
        let user = UserRecord {
            id: UserId::new(),
            email: "alex@example.com".to_string(),
        };

        assert!(directory.get_user(user.id).await.unwrap().is_none());
        directory.put_user(user.clone()).await.unwrap();
        assert_eq!(directory.get_user(user.id).await.unwrap(), Some(user));
    }
}
