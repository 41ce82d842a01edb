//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use checkout::CheckoutError;
use store::StoreError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Order placement error.
    Checkout(CheckoutError),
    /// Storage error outside the placement pipeline.
    Store(StoreError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Checkout(err) => checkout_error_to_response(err),
            ApiError::Store(err) => store_error_to_response(err),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "internal server error".to_string(),
                )
            }
        };

        let body = serde_json::json!({ "code": code, "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn checkout_error_to_response(err: CheckoutError) -> (StatusCode, &'static str, String) {
    let code = err.code();
    match &err {
        CheckoutError::Validation(_)
        | CheckoutError::EmptyCart
        | CheckoutError::ProductNotPurchasable(_) => (StatusCode::BAD_REQUEST, code, err.to_string()),
        CheckoutError::UserNotFound(_)
        | CheckoutError::ProductNotFound(_)
        | CheckoutError::VariantNotFound { .. } => (StatusCode::NOT_FOUND, code, err.to_string()),
        CheckoutError::InsufficientStock { .. } | CheckoutError::IdempotencyConflict { .. } => {
            (StatusCode::CONFLICT, code, err.to_string())
        }
        CheckoutError::DeadlineExceeded => (StatusCode::GATEWAY_TIMEOUT, code, err.to_string()),
        CheckoutError::CompensationFailure { .. } => {
            // Full context was logged at the point of failure; the client
            // only learns that placement failed.
            tracing::error!(error = %err, "order placement needs operator attention");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                code,
                "order placement failed".to_string(),
            )
        }
        CheckoutError::Store(_) => {
            tracing::error!(error = %err, "store error during checkout");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                code,
                "internal server error".to_string(),
            )
        }
    }
}

fn store_error_to_response(err: StoreError) -> (StatusCode, &'static str, String) {
    match &err {
        StoreError::Cart(cart_err) => (StatusCode::BAD_REQUEST, "CART", cart_err.to_string()),
        StoreError::CartNotFound(_) => (StatusCode::NOT_FOUND, "CART_NOT_FOUND", err.to_string()),
        StoreError::MissingVariant { .. } => {
            (StatusCode::NOT_FOUND, "VARIANT_NOT_FOUND", err.to_string())
        }
        _ => {
            tracing::error!(error = %err, "store error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "STORE",
                "internal server error".to_string(),
            )
        }
    }
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        ApiError::Checkout(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Store(err)
    }
}
