//! HTTP route handlers.

pub mod cart;
pub mod health;
pub mod metrics;
pub mod orders;

use axum::http::HeaderMap;
use common::UserId;

use crate::error::ApiError;

/// Extracts the acting user from the `x-user-id` header.
///
/// Authentication is out of scope; the header stands in for a session.
pub(crate) fn user_id_from_headers(headers: &HeaderMap) -> Result<UserId, ApiError> {
    let value = headers
        .get("x-user-id")
        .ok_or_else(|| ApiError::BadRequest("missing x-user-id header".to_string()))?;
    let value = value
        .to_str()
        .map_err(|_| ApiError::BadRequest("invalid x-user-id header".to_string()))?;
    let uuid = uuid::Uuid::parse_str(value)
        .map_err(|e| ApiError::BadRequest(format!("invalid x-user-id header: {e}")))?;
    Ok(UserId::from_uuid(uuid))
}
