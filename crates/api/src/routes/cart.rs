//! Cart endpoints.
//!
//! Cart reads are enriched with the live catalog: each line carries the
//! current price, stock and availability of its variant. Lines whose
//! product or variant has since vanished are dropped from the response,
//! and `total_items` counts the lines actually returned; checkout never
//! sees dropped lines either because placement revalidates.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use checkout::CheckoutError;
use common::{ProductId, SizeId};
use domain::{Cart, CartLine};
use serde::{Deserialize, Serialize};
use store::{CartStore, InventoryStore, OrderStore, UserDirectory};

use crate::error::ApiError;
use crate::routes::orders::AppState;
use crate::routes::user_id_from_headers;

// -- Request types --

#[derive(Deserialize)]
pub struct CartLineBody {
    pub product_id: uuid::Uuid,
    pub size_id: uuid::Uuid,
    pub quantity: u32,
}

// -- Response types --

#[derive(Serialize)]
pub struct CartResponse {
    pub total_items: u32,
    pub lines: Vec<CartLineResponse>,
    pub subtotal_cents: i64,
}

#[derive(Serialize)]
pub struct CartLineResponse {
    pub product_id: String,
    pub product_name: String,
    pub size_id: String,
    pub size_code: String,
    pub quantity: u32,
    pub price_cents: i64,
    pub stock: u32,
    pub is_available: bool,
}

// -- Handlers --

/// POST /cart — add a line to the user's cart, creating the cart if needed.
#[tracing::instrument(skip(state, headers, body))]
pub async fn add_line<I, C, O, U>(
    State(state): State<Arc<AppState<I, C, O, U>>>,
    headers: HeaderMap,
    Json(body): Json<CartLineBody>,
) -> Result<Json<CartResponse>, ApiError>
where
    I: InventoryStore + Clone + 'static,
    C: CartStore + 'static,
    O: OrderStore + Clone + 'static,
    U: UserDirectory + 'static,
{
    let user_id = user_id_from_headers(&headers)?;
    let product_id = ProductId::from_uuid(body.product_id);
    let size_id = SizeId::from_uuid(body.size_id);

    // Carting is advisory; checkout revalidates. Still reject lines that
    // cannot possibly be placed so the user learns early.
    let product = state
        .inventory
        .get_product(product_id)
        .await?
        .ok_or(CheckoutError::ProductNotFound(product_id))?;
    if !product.status.is_active() {
        return Err(CheckoutError::ProductNotPurchasable(product_id).into());
    }
    let variant = state
        .inventory
        .get_variant(product_id, size_id)
        .await?
        .ok_or(CheckoutError::VariantNotFound {
            product_id,
            size_id,
        })?;
    if !variant.is_available || body.quantity > variant.quantity {
        return Err(CheckoutError::InsufficientStock {
            product_id,
            size_id,
            requested: body.quantity,
            available: variant.quantity,
        }
        .into());
    }

    let cart = state
        .carts
        .add_line(user_id, CartLine::new(product_id, size_id, body.quantity))
        .await?;

    enrich(&state, &cart).await.map(Json)
}

/// GET /cart — read the user's cart with live catalog data.
#[tracing::instrument(skip(state, headers))]
pub async fn get<I, C, O, U>(
    State(state): State<Arc<AppState<I, C, O, U>>>,
    headers: HeaderMap,
) -> Result<Json<CartResponse>, ApiError>
where
    I: InventoryStore + Clone + 'static,
    C: CartStore + 'static,
    O: OrderStore + Clone + 'static,
    U: UserDirectory + 'static,
{
    let user_id = user_id_from_headers(&headers)?;

    match state.carts.get_cart(user_id).await? {
        Some(cart) => enrich(&state, &cart).await.map(Json),
        None => Ok(Json(CartResponse {
            total_items: 0,
            lines: Vec::new(),
            subtotal_cents: 0,
        })),
    }
}

/// PATCH /cart — change the quantity of an existing line.
#[tracing::instrument(skip(state, headers, body))]
pub async fn update_line<I, C, O, U>(
    State(state): State<Arc<AppState<I, C, O, U>>>,
    headers: HeaderMap,
    Json(body): Json<CartLineBody>,
) -> Result<Json<CartResponse>, ApiError>
where
    I: InventoryStore + Clone + 'static,
    C: CartStore + 'static,
    O: OrderStore + Clone + 'static,
    U: UserDirectory + 'static,
{
    let user_id = user_id_from_headers(&headers)?;

    let cart = state
        .carts
        .update_line_quantity(
            user_id,
            ProductId::from_uuid(body.product_id),
            SizeId::from_uuid(body.size_id),
            body.quantity,
        )
        .await?;

    enrich(&state, &cart).await.map(Json)
}

/// DELETE /cart/:product_id/:size_id — remove one line.
#[tracing::instrument(skip(state, headers))]
pub async fn remove_line<I, C, O, U>(
    State(state): State<Arc<AppState<I, C, O, U>>>,
    headers: HeaderMap,
    Path((product_id, size_id)): Path<(uuid::Uuid, uuid::Uuid)>,
) -> Result<Json<CartResponse>, ApiError>
where
    I: InventoryStore + Clone + 'static,
    C: CartStore + 'static,
    O: OrderStore + Clone + 'static,
    U: UserDirectory + 'static,
{
    let user_id = user_id_from_headers(&headers)?;

    let cart = state
        .carts
        .remove_line(
            user_id,
            ProductId::from_uuid(product_id),
            SizeId::from_uuid(size_id),
        )
        .await?;

    enrich(&state, &cart).await.map(Json)
}

/// DELETE /cart — empty the user's cart.
#[tracing::instrument(skip(state, headers))]
pub async fn clear<I, C, O, U>(
    State(state): State<Arc<AppState<I, C, O, U>>>,
    headers: HeaderMap,
) -> Result<axum::http::StatusCode, ApiError>
where
    I: InventoryStore + Clone + 'static,
    C: CartStore + 'static,
    O: OrderStore + Clone + 'static,
    U: UserDirectory + 'static,
{
    let user_id = user_id_from_headers(&headers)?;
    state.carts.clear_cart(user_id).await?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}

async fn enrich<I, C, O, U>(
    state: &AppState<I, C, O, U>,
    cart: &Cart,
) -> Result<CartResponse, ApiError>
where
    I: InventoryStore + Clone,
    C: CartStore,
    O: OrderStore + Clone,
    U: UserDirectory,
{
    let mut lines = Vec::with_capacity(cart.lines().len());
    let mut subtotal_cents = 0i64;

    for line in cart.lines() {
        let Some(product) = state.inventory.get_product(line.product_id).await? else {
            continue;
        };
        let Some(variant) = state
            .inventory
            .get_variant(line.product_id, line.size_id)
            .await?
        else {
            continue;
        };

        subtotal_cents += product.price.multiply(line.quantity).cents();
        lines.push(CartLineResponse {
            product_id: line.product_id.to_string(),
            product_name: product.name,
            size_id: line.size_id.to_string(),
            size_code: variant.size_code,
            quantity: line.quantity,
            price_cents: product.price.cents(),
            stock: variant.quantity,
            is_available: variant.is_available,
        });
    }

    // Count what is actually returned so a dropped line never leaves
    // the totals out of step with the listing.
    Ok(CartResponse {
        total_items: lines.len() as u32,
        lines,
        subtotal_cents,
    })
}
