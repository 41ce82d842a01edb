//! HTTP API server with observability for the checkout system.
//!
//! Provides REST endpoints for cart management and order placement,
//! with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::{delete, get, patch, post};
use checkout::CheckoutCoordinator;
use metrics_exporter_prometheus::PrometheusHandle;
use store::{
    CartStore, InMemoryCartStore, InMemoryInventoryStore, InMemoryOrderStore,
    InMemoryUserDirectory, InventoryStore, OrderStore, UserDirectory,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::orders::AppState;

/// Application state over the in-memory backends.
pub type InMemoryAppState = AppState<
    InMemoryInventoryStore,
    InMemoryCartStore,
    InMemoryOrderStore,
    InMemoryUserDirectory,
>;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<I, C, O, U>(
    state: Arc<AppState<I, C, O, U>>,
    metrics_handle: PrometheusHandle,
) -> Router
where
    I: InventoryStore + Clone + 'static,
    C: CartStore + 'static,
    O: OrderStore + Clone + 'static,
    U: UserDirectory + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/cart", post(routes::cart::add_line::<I, C, O, U>))
        .route("/cart", get(routes::cart::get::<I, C, O, U>))
        .route("/cart", patch(routes::cart::update_line::<I, C, O, U>))
        .route("/cart", delete(routes::cart::clear::<I, C, O, U>))
        .route(
            "/cart/{product_id}/{size_id}",
            delete(routes::cart::remove_line::<I, C, O, U>),
        )
        .route("/orders", post(routes::orders::place::<I, C, O, U>))
        .route("/orders", get(routes::orders::list::<I, C, O, U>))
        .route("/orders/{id}", get(routes::orders::get::<I, C, O, U>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates application state backed by the in-memory stores.
pub fn create_default_state(checkout_deadline: Duration) -> Arc<InMemoryAppState> {
    let inventory = InMemoryInventoryStore::new();
    let carts = InMemoryCartStore::new();
    let orders = InMemoryOrderStore::new();
    let users = InMemoryUserDirectory::new();

    let coordinator = CheckoutCoordinator::new(
        inventory.clone(),
        carts.clone(),
        orders.clone(),
        users.clone(),
        checkout_deadline,
    );

    Arc::new(AppState {
        inventory,
        carts,
        orders,
        users,
        coordinator,
    })
}
