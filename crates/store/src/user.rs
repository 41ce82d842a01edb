//! User directory trait.
//!
//! The checkout pipeline only needs the email for the order record;
//! account management lives elsewhere.

use async_trait::async_trait;
use common::UserId;

use crate::error::Result;

/// The user fields checkout reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: UserId,
    pub email: String,
}

/// Trait for user lookup.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Loads a user by id.
    async fn get_user(&self, user_id: UserId) -> Result<Option<UserRecord>>;

    /// Inserts or replaces a user record.
    async fn put_user(&self, user: UserRecord) -> Result<()>;
}
