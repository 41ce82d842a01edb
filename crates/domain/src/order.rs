//! Order document and its immutable item snapshots.

use chrono::{DateTime, Utc};
use common::{OrderId, ProductId, SizeId, UserId};
use serde::{Deserialize, Serialize};

use crate::delivery::DeliveryInfo;
use crate::money::Money;
use crate::payment::{PaymentInfo, PaymentMethod};
use crate::pricing;

/// Lifecycle status of an order.
///
/// Orders are created `Pending`; every later transition belongs to the
/// fulfillment workflow layered on top of order placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Pending,
    Paid,
    Processing,
    Shipping,
    Completed,
    Cancelled,
    Refunded,
}

impl OrderStatus {
    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Paid => "PAID",
            OrderStatus::Processing => "PROCESSING",
            OrderStatus::Shipping => "SHIPPING",
            OrderStatus::Completed => "COMPLETED",
            OrderStatus::Cancelled => "CANCELLED",
            OrderStatus::Refunded => "REFUNDED",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(OrderStatus::Pending),
            "PAID" => Ok(OrderStatus::Paid),
            "PROCESSING" => Ok(OrderStatus::Processing),
            "SHIPPING" => Ok(OrderStatus::Shipping),
            "COMPLETED" => Ok(OrderStatus::Completed),
            "CANCELLED" => Ok(OrderStatus::Cancelled),
            "REFUNDED" => Ok(OrderStatus::Refunded),
            other => Err(format!("unknown order status: {other}")),
        }
    }
}

/// An immutable line of a placed order.
///
/// All product and size fields are copied at purchase time; later catalog
/// edits never alter a persisted order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub product_slug: String,

    /// Unit price at purchase time.
    pub price: Money,

    pub size_id: SizeId,
    pub size_code: String,
    pub size_name: String,

    pub quantity: u32,

    /// `price * quantity`, fixed at creation.
    pub total_price: Money,
}

impl OrderItem {
    /// Creates an item snapshot, computing the line total.
    #[allow(clippy::too_many_arguments)]
    pub fn snapshot(
        product_id: ProductId,
        product_name: impl Into<String>,
        product_slug: impl Into<String>,
        price: Money,
        size_id: SizeId,
        size_code: impl Into<String>,
        size_name: impl Into<String>,
        quantity: u32,
    ) -> Self {
        Self {
            product_id,
            product_name: product_name.into(),
            product_slug: product_slug.into(),
            price,
            size_id,
            size_code: size_code.into(),
            size_name: size_name.into(),
            quantity,
            total_price: price.multiply(quantity),
        }
    }
}

/// A placed order.
///
/// Created exactly once per successful checkout; the cart that produced it
/// holds no reference to it and vice versa.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub user_email: String,

    pub items: Vec<OrderItem>,
    pub delivery: DeliveryInfo,

    pub subtotal: Money,
    pub shipping_fee: Money,
    /// `subtotal + shipping_fee`, exactly.
    pub total_amount: Money,

    pub status: OrderStatus,
    pub payment: PaymentInfo,

    pub admin_note: Option<String>,
    /// Soft-delete flag; soft-deleted orders are hidden from queries.
    pub is_deleted: bool,

    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Assembles a new pending order from item snapshots.
    ///
    /// Computes `subtotal` as the sum of line totals, applies the shipping
    /// fee rule, and records an unpaid payment intent.
    pub fn new(
        user_id: UserId,
        user_email: impl Into<String>,
        items: Vec<OrderItem>,
        delivery: DeliveryInfo,
        payment_method: PaymentMethod,
    ) -> Self {
        let subtotal: Money = items.iter().map(|i| i.total_price).sum();
        let shipping_fee = pricing::shipping_fee_for(subtotal);

        Self {
            id: OrderId::new(),
            user_id,
            user_email: user_email.into(),
            items,
            delivery,
            subtotal,
            shipping_fee,
            total_amount: subtotal + shipping_fee,
            status: OrderStatus::Pending,
            payment: PaymentInfo::unpaid(payment_method),
            admin_note: None,
            is_deleted: false,
            created_at: Utc::now(),
        }
    }
}
