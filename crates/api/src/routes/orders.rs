//! Order placement and lookup endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use checkout::{CheckoutCoordinator, PlaceOrderRequest};
use common::{OrderId, UserId};
use domain::{DeliveryInfo, Order, OrderStatus, PaymentMethod};
use serde::{Deserialize, Serialize};
use store::{CartStore, InventoryStore, OrderStore, UserDirectory};

use crate::error::ApiError;
use crate::routes::user_id_from_headers;

/// Shared application state accessible from all handlers.
pub struct AppState<I, C, O, U>
where
    I: InventoryStore + Clone,
    C: CartStore,
    O: OrderStore + Clone,
    U: UserDirectory,
{
    pub inventory: I,
    pub carts: C,
    pub orders: O,
    pub users: U,
    pub coordinator: CheckoutCoordinator<I, C, O, U>,
}

// -- Request types --

#[derive(Deserialize)]
pub struct PlaceOrderBody {
    pub delivery: DeliveryInfo,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListOrdersQuery {
    pub user_id: Option<uuid::Uuid>,
    pub status: Option<String>,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderPlacedResponse {
    pub order_id: String,
    pub status: String,
    pub total_amount_cents: i64,
}

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub user_id: String,
    pub status: String,
    pub items: Vec<OrderItemResponse>,
    pub subtotal_cents: i64,
    pub shipping_fee_cents: i64,
    pub total_amount_cents: i64,
    pub payment_method: String,
    pub payment_status: String,
    pub receiver_name: String,
    pub created_at: String,
}

#[derive(Serialize)]
pub struct OrderItemResponse {
    pub product_id: String,
    pub product_name: String,
    pub size_code: String,
    pub quantity: u32,
    pub price_cents: i64,
    pub total_price_cents: i64,
}

impl OrderResponse {
    fn from_order(order: &Order) -> Self {
        Self {
            id: order.id.to_string(),
            user_id: order.user_id.to_string(),
            status: order.status.as_str().to_string(),
            items: order
                .items
                .iter()
                .map(|item| OrderItemResponse {
                    product_id: item.product_id.to_string(),
                    product_name: item.product_name.clone(),
                    size_code: item.size_code.clone(),
                    quantity: item.quantity,
                    price_cents: item.price.cents(),
                    total_price_cents: item.total_price.cents(),
                })
                .collect(),
            subtotal_cents: order.subtotal.cents(),
            shipping_fee_cents: order.shipping_fee.cents(),
            total_amount_cents: order.total_amount.cents(),
            payment_method: order.payment.method.as_str().to_string(),
            payment_status: order.payment.status.as_str().to_string(),
            receiver_name: order.delivery.receiver_name.clone(),
            created_at: order.created_at.to_rfc3339(),
        }
    }
}

// -- Handlers --

/// POST /orders — place an order from the user's current cart.
#[tracing::instrument(skip(state, headers, body))]
pub async fn place<I, C, O, U>(
    State(state): State<Arc<AppState<I, C, O, U>>>,
    headers: HeaderMap,
    Json(body): Json<PlaceOrderBody>,
) -> Result<(axum::http::StatusCode, Json<OrderPlacedResponse>), ApiError>
where
    I: InventoryStore + Clone + 'static,
    C: CartStore + 'static,
    O: OrderStore + Clone + 'static,
    U: UserDirectory + 'static,
{
    let user_id = user_id_from_headers(&headers)?;

    let receipt = state
        .coordinator
        .place_order(
            user_id,
            PlaceOrderRequest {
                delivery: body.delivery,
                payment_method: body.payment_method,
                idempotency_key: body.idempotency_key,
            },
        )
        .await?;

    let response = OrderPlacedResponse {
        order_id: receipt.order_id.to_string(),
        status: receipt.status.as_str().to_string(),
        total_amount_cents: receipt.total_amount.cents(),
    };

    Ok((axum::http::StatusCode::CREATED, Json(response)))
}

/// GET /orders/:id — load an order by ID.
#[tracing::instrument(skip(state))]
pub async fn get<I, C, O, U>(
    State(state): State<Arc<AppState<I, C, O, U>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError>
where
    I: InventoryStore + Clone + 'static,
    C: CartStore + 'static,
    O: OrderStore + Clone + 'static,
    U: UserDirectory + 'static,
{
    let order_id = parse_order_id(&id)?;
    let order = state
        .orders
        .get_order(order_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Order {id} not found")))?;

    Ok(Json(OrderResponse::from_order(&order)))
}

/// GET /orders — list orders by user and/or status.
#[tracing::instrument(skip(state))]
pub async fn list<I, C, O, U>(
    State(state): State<Arc<AppState<I, C, O, U>>>,
    Query(query): Query<ListOrdersQuery>,
) -> Result<Json<Vec<OrderResponse>>, ApiError>
where
    I: InventoryStore + Clone + 'static,
    C: CartStore + 'static,
    O: OrderStore + Clone + 'static,
    U: UserDirectory + 'static,
{
    let status = query
        .status
        .as_deref()
        .map(|s| s.parse::<OrderStatus>().map_err(ApiError::BadRequest))
        .transpose()?;

    let orders = match (query.user_id, status) {
        (Some(user_id), _) => {
            let mut orders = state.orders.list_by_user(UserId::from_uuid(user_id)).await?;
            if let Some(status) = status {
                orders.retain(|order| order.status == status);
            }
            orders
        }
        (None, Some(status)) => state.orders.list_by_status(status).await?,
        (None, None) => {
            return Err(ApiError::BadRequest(
                "either user_id or status query parameter is required".to_string(),
            ));
        }
    };

    Ok(Json(orders.iter().map(OrderResponse::from_order).collect()))
}

fn parse_order_id(id: &str) -> Result<OrderId, ApiError> {
    uuid::Uuid::parse_str(id)
        .map(OrderId::from_uuid)
        .map_err(|e| ApiError::BadRequest(format!("Invalid order ID: {e}")))
}
