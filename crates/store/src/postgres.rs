//! PostgreSQL-backed store implementations.
//!
//! Stock writes use conditional `UPDATE` statements so the check and the
//! decrement are one atomic operation inside the database; carts and
//! orders are stored as JSONB documents with indexed columns for the
//! fields queries filter on.

use async_trait::async_trait;
use common::{OrderId, ProductId, SizeId, UserId};
use domain::{Cart, CartLine, Order, OrderStatus, Product, ProductStatus};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::{
    IdempotencyRecord, ProductSnapshot, ReserveOutcome, StoreError, UserRecord, VariantSnapshot,
    cart::CartStore,
    error::Result,
    inventory::InventoryStore,
    order::OrderStore,
    user::UserDirectory,
};

/// Runs the database migrations.
pub async fn run_migrations(pool: &PgPool) -> std::result::Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../migrations").run(pool).await
}

/// PostgreSQL inventory store.
#[derive(Clone)]
pub struct PostgresInventoryStore {
    pool: PgPool,
}

impl PostgresInventoryStore {
    /// Creates a new PostgreSQL inventory store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InventoryStore for PostgresInventoryStore {
    #[tracing::instrument(skip(self))]
    async fn get_product(&self, product_id: ProductId) -> Result<Option<ProductSnapshot>> {
        let row = sqlx::query(
            "SELECT name, slug, price_cents, status FROM products WHERE id = $1",
        )
        .bind(product_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| {
            let status: String = row.try_get("status")?;
            let status: ProductStatus = status
                .parse()
                .map_err(StoreError::Unavailable)?;
            Ok(ProductSnapshot {
                name: row.try_get("name")?,
                slug: row.try_get("slug")?,
                price: domain::Money::from_cents(row.try_get("price_cents")?),
                status,
            })
        })
        .transpose()
    }

    #[tracing::instrument(skip(self))]
    async fn get_variant(
        &self,
        product_id: ProductId,
        size_id: SizeId,
    ) -> Result<Option<VariantSnapshot>> {
        let row = sqlx::query(
            r#"
            SELECT size_code, size_name, quantity, is_available
            FROM product_variants
            WHERE product_id = $1 AND size_id = $2
            "#,
        )
        .bind(product_id.as_uuid())
        .bind(size_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| {
            let quantity: i64 = row.try_get("quantity")?;
            Ok(VariantSnapshot {
                size_code: row.try_get("size_code")?,
                size_name: row.try_get("size_name")?,
                quantity: u32::try_from(quantity).unwrap_or(0),
                is_available: row.try_get("is_available")?,
            })
        })
        .transpose()
    }

    #[tracing::instrument(skip(self))]
    async fn reserve_stock(
        &self,
        product_id: ProductId,
        size_id: SizeId,
        quantity: u32,
    ) -> Result<ReserveOutcome> {
        // The WHERE clause carries the stock check; the row is only
        // updated when enough stock exists, making check-and-decrement
        // a single atomic statement.
        let result = sqlx::query(
            r#"
            UPDATE product_variants
            SET quantity = quantity - $3,
                is_available = quantity - $3 > 0
            WHERE product_id = $1 AND size_id = $2 AND quantity >= $3
            "#,
        )
        .bind(product_id.as_uuid())
        .bind(size_id.as_uuid())
        .bind(i64::from(quantity))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(ReserveOutcome::Reserved);
        }

        // Nothing changed; read the row to tell the two failure modes apart.
        let available: Option<i64> = sqlx::query_scalar(
            "SELECT quantity FROM product_variants WHERE product_id = $1 AND size_id = $2",
        )
        .bind(product_id.as_uuid())
        .bind(size_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(match available {
            Some(available) => ReserveOutcome::InsufficientStock {
                available: u32::try_from(available).unwrap_or(0),
            },
            None => ReserveOutcome::VariantNotFound,
        })
    }

    #[tracing::instrument(skip(self))]
    async fn restore_stock(
        &self,
        product_id: ProductId,
        size_id: SizeId,
        quantity: u32,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE product_variants
            SET quantity = quantity + $3,
                is_available = quantity + $3 > 0
            WHERE product_id = $1 AND size_id = $2
            "#,
        )
        .bind(product_id.as_uuid())
        .bind(size_id.as_uuid())
        .bind(i64::from(quantity))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::MissingVariant {
                product_id,
                size_id,
            });
        }
        Ok(())
    }

    #[tracing::instrument(skip(self, product), fields(product_id = %product.id))]
    async fn put_product(&self, product: Product) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO products (id, name, slug, price_cents, status)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE
            SET name = EXCLUDED.name,
                slug = EXCLUDED.slug,
                price_cents = EXCLUDED.price_cents,
                status = EXCLUDED.status
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(&product.name)
        .bind(&product.slug)
        .bind(product.price.cents())
        .bind(product.status.as_str())
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM product_variants WHERE product_id = $1")
            .bind(product.id.as_uuid())
            .execute(&mut *tx)
            .await?;

        for variant in &product.variants {
            sqlx::query(
                r#"
                INSERT INTO product_variants (product_id, size_id, size_code, size_name, quantity, is_available)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(product.id.as_uuid())
            .bind(variant.size_id.as_uuid())
            .bind(&variant.size_code)
            .bind(&variant.size_name)
            .bind(i64::from(variant.quantity))
            .bind(variant.is_available)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

/// PostgreSQL cart store.
///
/// Each cart is one JSONB document row; mutations run the domain cart
/// operation inside a transaction holding the row lock, so concurrent
/// mutations of the same cart serialize.
#[derive(Clone)]
pub struct PostgresCartStore {
    pool: PgPool,
}

impl PostgresCartStore {
    /// Creates a new PostgreSQL cart store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn mutate<F>(&self, user_id: UserId, create_if_missing: bool, f: F) -> Result<Cart>
    where
        F: FnOnce(&mut Cart) -> Result<()>,
    {
        let mut tx = self.pool.begin().await?;

        if create_if_missing {
            let empty = serde_json::to_value(Cart::new(user_id))?;
            sqlx::query(
                "INSERT INTO carts (user_id, doc) VALUES ($1, $2) ON CONFLICT (user_id) DO NOTHING",
            )
            .bind(user_id.as_uuid())
            .bind(empty)
            .execute(&mut *tx)
            .await?;
        }

        let doc: Option<serde_json::Value> =
            sqlx::query_scalar("SELECT doc FROM carts WHERE user_id = $1 FOR UPDATE")
                .bind(user_id.as_uuid())
                .fetch_optional(&mut *tx)
                .await?;

        let mut cart: Cart = match doc {
            Some(doc) => serde_json::from_value(doc)?,
            None => return Err(StoreError::CartNotFound(user_id)),
        };

        f(&mut cart)?;

        sqlx::query("UPDATE carts SET doc = $2 WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .bind(serde_json::to_value(&cart)?)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(cart)
    }
}

#[async_trait]
impl CartStore for PostgresCartStore {
    #[tracing::instrument(skip(self))]
    async fn get_cart(&self, user_id: UserId) -> Result<Option<Cart>> {
        let doc: Option<serde_json::Value> =
            sqlx::query_scalar("SELECT doc FROM carts WHERE user_id = $1")
                .bind(user_id.as_uuid())
                .fetch_optional(&self.pool)
                .await?;

        doc.map(|doc| serde_json::from_value(doc).map_err(StoreError::from))
            .transpose()
    }

    #[tracing::instrument(skip(self))]
    async fn add_line(&self, user_id: UserId, line: CartLine) -> Result<Cart> {
        self.mutate(user_id, true, |cart| {
            cart.add_line(line.product_id, line.size_id, line.quantity)
                .map_err(StoreError::from)
        })
        .await
    }

    #[tracing::instrument(skip(self))]
    async fn update_line_quantity(
        &self,
        user_id: UserId,
        product_id: ProductId,
        size_id: SizeId,
        new_quantity: u32,
    ) -> Result<Cart> {
        self.mutate(user_id, false, |cart| {
            cart.update_line_quantity(product_id, size_id, new_quantity)
                .map_err(StoreError::from)
        })
        .await
    }

    #[tracing::instrument(skip(self))]
    async fn remove_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
        size_id: SizeId,
    ) -> Result<Cart> {
        self.mutate(user_id, false, |cart| {
            cart.remove_line(product_id, size_id).map_err(StoreError::from)
        })
        .await
    }

    #[tracing::instrument(skip(self))]
    async fn clear_cart(&self, user_id: UserId) -> Result<()> {
        match self.mutate(user_id, false, |cart| {
            cart.clear();
            Ok(())
        })
        .await
        {
            Ok(_) | Err(StoreError::CartNotFound(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

/// PostgreSQL order store.
#[derive(Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
}

impl PostgresOrderStore {
    /// Creates a new PostgreSQL order store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_order(doc: serde_json::Value) -> Result<Order> {
        serde_json::from_value(doc).map_err(StoreError::from)
    }
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    #[tracing::instrument(skip(self, order), fields(order_id = %order.id))]
    async fn insert_order(&self, order: &Order) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO orders (id, user_id, status, is_deleted, created_at, doc)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.user_id.as_uuid())
        .bind(order.status.as_str())
        .bind(order.is_deleted)
        .bind(order.created_at)
        .bind(serde_json::to_value(order)?)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        let doc: Option<serde_json::Value> = sqlx::query_scalar(
            "SELECT doc FROM orders WHERE id = $1 AND is_deleted = FALSE",
        )
        .bind(order_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        doc.map(Self::row_to_order).transpose()
    }

    #[tracing::instrument(skip(self))]
    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        let docs: Vec<serde_json::Value> = sqlx::query_scalar(
            r#"
            SELECT doc FROM orders
            WHERE user_id = $1 AND is_deleted = FALSE
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        docs.into_iter().map(Self::row_to_order).collect()
    }

    #[tracing::instrument(skip(self))]
    async fn list_by_status(&self, status: OrderStatus) -> Result<Vec<Order>> {
        let docs: Vec<serde_json::Value> = sqlx::query_scalar(
            r#"
            SELECT doc FROM orders
            WHERE status = $1 AND is_deleted = FALSE
            ORDER BY created_at DESC
            "#,
        )
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await?;

        docs.into_iter().map(Self::row_to_order).collect()
    }

    #[tracing::instrument(skip(self))]
    async fn find_idempotency_key(&self, key: &str) -> Result<Option<IdempotencyRecord>> {
        let row = sqlx::query(
            "SELECT order_id, fingerprint FROM order_idempotency WHERE key = $1",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| {
            Ok(IdempotencyRecord {
                order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
                fingerprint: row.try_get("fingerprint")?,
            })
        })
        .transpose()
    }

    #[tracing::instrument(skip(self, record))]
    async fn record_idempotency_key(
        &self,
        key: &str,
        record: IdempotencyRecord,
    ) -> Result<IdempotencyRecord> {
        sqlx::query(
            r#"
            INSERT INTO order_idempotency (key, order_id, fingerprint)
            VALUES ($1, $2, $3)
            ON CONFLICT (key) DO NOTHING
            "#,
        )
        .bind(key)
        .bind(record.order_id.as_uuid())
        .bind(&record.fingerprint)
        .execute(&self.pool)
        .await?;

        // Read back the row so a lost insert race surfaces the winner.
        self.find_idempotency_key(key).await?.ok_or_else(|| {
            StoreError::Unavailable(format!("idempotency key '{key}' vanished after insert"))
        })
    }

    #[tracing::instrument(skip(self))]
    async fn soft_delete_order(&self, order_id: OrderId) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE orders
            SET is_deleted = TRUE,
                doc = jsonb_set(doc, '{is_deleted}', 'true'::jsonb)
            WHERE id = $1
            "#,
        )
        .bind(order_id.as_uuid())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// PostgreSQL user directory.
#[derive(Clone)]
pub struct PostgresUserDirectory {
    pool: PgPool,
}

impl PostgresUserDirectory {
    /// Creates a new PostgreSQL user directory.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PostgresUserDirectory {
    #[tracing::instrument(skip(self))]
    async fn get_user(&self, user_id: UserId) -> Result<Option<UserRecord>> {
        let row = sqlx::query("SELECT id, email FROM users WHERE id = $1")
            .bind(user_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| {
            Ok(UserRecord {
                id: UserId::from_uuid(row.try_get::<Uuid, _>("id")?),
                email: row.try_get("email")?,
            })
        })
        .transpose()
    }

    #[tracing::instrument(skip(self, user), fields(user_id = %user.id))]
    async fn put_user(&self, user: UserRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email)
            VALUES ($1, $2)
            ON CONFLICT (id) DO UPDATE SET email = EXCLUDED.email
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.email)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
