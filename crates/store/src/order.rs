//! Order store trait and the idempotency ledger.

use async_trait::async_trait;
use common::{OrderId, UserId};
use domain::{Order, OrderStatus};

use crate::error::Result;

/// A recorded idempotency key and what it produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdempotencyRecord {
    /// The order the keyed request created.
    pub order_id: OrderId,

    /// Digest of the request payload, used to detect key reuse with a
    /// different payload.
    pub fingerprint: String,
}

/// Trait for order storage.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persists a new order as a single write.
    async fn insert_order(&self, order: &Order) -> Result<()>;

    /// Loads an order by id. Soft-deleted orders are not returned.
    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>>;

    /// Lists a user's orders, newest first. Soft-deleted orders excluded.
    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<Order>>;

    /// Lists orders in a status, newest first. Soft-deleted orders excluded.
    async fn list_by_status(&self, status: OrderStatus) -> Result<Vec<Order>>;

    /// Looks up a previously recorded idempotency key.
    async fn find_idempotency_key(&self, key: &str) -> Result<Option<IdempotencyRecord>>;

    /// Records an idempotency key against the order it produced.
    ///
    /// The first writer wins: if the key is already recorded, the ledger
    /// is left untouched. Returns the record that ended up stored, so a
    /// caller that lost a same-key race can discover the winning order.
    async fn record_idempotency_key(
        &self,
        key: &str,
        record: IdempotencyRecord,
    ) -> Result<IdempotencyRecord>;

    /// Soft-deletes an order, hiding it from reads and listings.
    async fn soft_delete_order(&self, order_id: OrderId) -> Result<()>;
}
