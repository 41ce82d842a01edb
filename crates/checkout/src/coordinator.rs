//! Checkout coordinator for orchestrating order placement.

use std::time::{Duration, Instant};

use common::{OrderId, UserId};
use domain::{DeliveryInfo, Money, OrderStatus, PaymentMethod};
use serde::Serialize;
use store::{
    CartStore, IdempotencyRecord, InventoryStore, OrderStore, StoreError, UserDirectory,
};

use crate::assembly::OrderAssembler;
use crate::error::{CheckoutError, Result};
use crate::reservation::{ReservedLine, StockReservationService};
use crate::state::CheckoutState;

/// A request to place an order from the user's current cart.
#[derive(Debug, Clone)]
pub struct PlaceOrderRequest {
    /// Where and to whom the order ships.
    pub delivery: DeliveryInfo,
    /// How the order will be paid.
    pub payment_method: PaymentMethod,
    /// Optional client-chosen key making the request replay-safe.
    pub idempotency_key: Option<String>,
}

/// What a successful (or replayed) placement returns.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderReceipt {
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub total_amount: Money,
}

/// Fields that identify a placement request for idempotency purposes.
///
/// Deliberately excludes cart contents: the cart is cleared by a
/// successful placement, so a replay of the same request must match the
/// ledger even though the cart has since changed.
#[derive(Serialize)]
struct RequestFingerprint<'a> {
    user_id: UserId,
    delivery: &'a DeliveryInfo,
    payment_method: PaymentMethod,
}

/// Orchestrates the order placement pipeline.
///
/// The pipeline runs cart load, stock reservation, order assembly and
/// cart clear as explicit sequential steps, checking the deadline between
/// them. Reserved stock is always either covered by a persisted order or
/// restored before an error is returned; the one exception is a restore
/// that itself fails, which surfaces as
/// [`CheckoutError::CompensationFailure`].
pub struct CheckoutCoordinator<I, C, O, U>
where
    I: InventoryStore + Clone,
    C: CartStore,
    O: OrderStore + Clone,
    U: UserDirectory,
{
    carts: C,
    orders: O,
    users: U,
    reservation: StockReservationService<I>,
    assembler: OrderAssembler<I, O>,
    deadline: Duration,
}

impl<I, C, O, U> CheckoutCoordinator<I, C, O, U>
where
    I: InventoryStore + Clone,
    C: CartStore,
    O: OrderStore + Clone,
    U: UserDirectory,
{
    /// Creates a new coordinator with the given per-attempt deadline.
    pub fn new(inventory: I, carts: C, orders: O, users: U, deadline: Duration) -> Self {
        let reservation = StockReservationService::new(inventory.clone());
        let assembler = OrderAssembler::new(inventory, orders.clone());
        Self {
            carts,
            orders,
            users,
            reservation,
            assembler,
            deadline,
        }
    }

    /// Places an order from the user's current cart.
    ///
    /// On success the cart has been emptied, stock decremented and the
    /// order persisted. On failure no order exists and stock is back where
    /// it started, except for [`CheckoutError::CompensationFailure`].
    #[tracing::instrument(skip(self, request), fields(payment_method = %request.payment_method.as_str()))]
    pub async fn place_order(
        &self,
        user_id: UserId,
        request: PlaceOrderRequest,
    ) -> Result<OrderReceipt> {
        metrics::counter!("checkout_attempts_total").increment(1);
        let started = Instant::now();
        let mut state = CheckoutState::Started;

        // Replay detection runs before any side effect.
        let fingerprint = match &request.idempotency_key {
            Some(key) => {
                let fingerprint = Self::fingerprint(user_id, &request)?;
                if let Some(receipt) = self.check_idempotency(key, &fingerprint).await? {
                    return Ok(receipt);
                }
                Some((key.clone(), fingerprint))
            }
            None => None,
        };

        let result = self
            .run_pipeline(user_id, &request, fingerprint, started, &mut state)
            .await;

        match &result {
            Ok(receipt) => {
                metrics::counter!("checkout_completed_total").increment(1);
                metrics::histogram!("checkout_duration_seconds")
                    .record(started.elapsed().as_secs_f64());
                tracing::info!(order_id = %receipt.order_id, state = %state, "checkout completed");
            }
            Err(e) => {
                state = CheckoutState::Failed {
                    reason: e.code().to_string(),
                };
                metrics::counter!("checkout_failed_total", "code" => e.code()).increment(1);
                tracing::warn!(state = %state, code = e.code(), error = %e, "checkout failed");
            }
        }

        result
    }

    async fn run_pipeline(
        &self,
        user_id: UserId,
        request: &PlaceOrderRequest,
        fingerprint: Option<(String, String)>,
        started: Instant,
        state: &mut CheckoutState,
    ) -> Result<OrderReceipt> {
        let user = self
            .users
            .get_user(user_id)
            .await?
            .ok_or(CheckoutError::UserNotFound(user_id))?;

        let cart = self
            .carts
            .get_cart(user_id)
            .await?
            .filter(|cart| !cart.is_empty())
            .ok_or(CheckoutError::EmptyCart)?;
        *state = CheckoutState::CartLoaded;

        self.reservation.prevalidate(cart.lines()).await?;

        // Nothing is held yet, so an expired deadline is a plain failure.
        if self.expired(started) {
            return Err(CheckoutError::DeadlineExceeded);
        }

        let reserved = self.reservation.reserve(cart.lines()).await?;
        *state = CheckoutState::StockReserved;

        // From here on, stock is held; every exit path must either persist
        // the order or release the reservation.
        if self.expired(started) {
            self.reservation.release(reserved).await?;
            return Err(CheckoutError::DeadlineExceeded);
        }

        let order = match self
            .assembler
            .assemble_and_persist(
                &user,
                &reserved,
                request.delivery.clone(),
                request.payment_method,
            )
            .await
        {
            Ok(order) => order,
            Err(e) => {
                self.reservation.release(reserved).await?;
                return Err(e);
            }
        };
        *state = CheckoutState::OrderPersisted;

        // A ledger write failure never undoes a persisted order; a lost
        // same-key race does, so only one order survives per key.
        if let Some((key, fingerprint)) = fingerprint {
            let record = IdempotencyRecord {
                order_id: order.id,
                fingerprint: fingerprint.clone(),
            };
            match self.orders.record_idempotency_key(&key, record).await {
                Ok(stored) if stored.order_id != order.id => {
                    return self
                        .yield_to_ledger_winner(order.id, reserved, key, fingerprint, stored)
                        .await;
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(order_id = %order.id, error = %e, "failed to record idempotency key");
                }
            }
        }

        match self.carts.clear_cart(user_id).await {
            Ok(()) => *state = CheckoutState::CartCleared,
            Err(e) => {
                tracing::warn!(order_id = %order.id, error = %e, "cart clear failed after order persisted");
            }
        }

        Ok(OrderReceipt {
            order_id: order.id,
            status: order.status,
            total_amount: order.total_amount,
        })
    }

    /// Undoes a placement that lost a same-key race against a concurrent
    /// attempt.
    ///
    /// The winner's ledger entry is authoritative: this attempt's stock
    /// is released and its order retracted, then the winner's receipt is
    /// returned (or a conflict, if the winner carried a different
    /// payload).
    async fn yield_to_ledger_winner(
        &self,
        own_order_id: OrderId,
        reserved: Vec<ReservedLine>,
        key: String,
        fingerprint: String,
        stored: IdempotencyRecord,
    ) -> Result<OrderReceipt> {
        self.reservation.release(reserved).await?;
        if let Err(e) = self.orders.soft_delete_order(own_order_id).await {
            tracing::error!(order_id = %own_order_id, error = %e, "failed to retract duplicate order");
        }

        if stored.fingerprint != fingerprint {
            return Err(CheckoutError::IdempotencyConflict { key });
        }

        let winner = self
            .orders
            .get_order(stored.order_id)
            .await?
            .ok_or_else(|| {
                StoreError::Unavailable(format!(
                    "idempotency key '{key}' points at missing order {}",
                    stored.order_id
                ))
            })?;

        metrics::counter!("checkout_idempotent_replays_total").increment(1);
        tracing::info!(order_id = %winner.id, "same-key race lost, deferring to existing order");

        Ok(OrderReceipt {
            order_id: winner.id,
            status: winner.status,
            total_amount: winner.total_amount,
        })
    }

    /// Looks up the idempotency ledger for a prior placement.
    ///
    /// A hit with a matching fingerprint returns the original order's
    /// receipt; a hit with a different fingerprint is a conflict.
    async fn check_idempotency(&self, key: &str, fingerprint: &str) -> Result<Option<OrderReceipt>> {
        let Some(record) = self.orders.find_idempotency_key(key).await? else {
            return Ok(None);
        };

        if record.fingerprint != fingerprint {
            return Err(CheckoutError::IdempotencyConflict {
                key: key.to_string(),
            });
        }

        let order = self
            .orders
            .get_order(record.order_id)
            .await?
            .ok_or_else(|| {
                StoreError::Unavailable(format!(
                    "idempotency key '{key}' points at missing order {}",
                    record.order_id
                ))
            })?;

        metrics::counter!("checkout_idempotent_replays_total").increment(1);
        tracing::info!(order_id = %order.id, "idempotent replay, returning existing order");

        Ok(Some(OrderReceipt {
            order_id: order.id,
            status: order.status,
            total_amount: order.total_amount,
        }))
    }

    fn fingerprint(user_id: UserId, request: &PlaceOrderRequest) -> Result<String> {
        let payload = RequestFingerprint {
            user_id,
            delivery: &request.delivery,
            payment_method: request.payment_method,
        };
        Ok(serde_json::to_string(&payload).map_err(StoreError::from)?)
    }

    fn expired(&self, started: Instant) -> bool {
        started.elapsed() >= self.deadline
    }
}
