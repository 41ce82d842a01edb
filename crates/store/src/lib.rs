//! Storage layer for the checkout system.
//!
//! Defines the store traits the pipeline depends on (inventory, cart,
//! order, and user lookup) with an in-memory backend for tests and the
//! default server, and a PostgreSQL backend for deployment.

pub mod cart;
pub mod error;
pub mod inventory;
pub mod memory;
pub mod order;
pub mod postgres;
pub mod user;

pub use cart::CartStore;
pub use error::{Result, StoreError};
pub use inventory::{InventoryStore, ProductSnapshot, ReserveOutcome, VariantSnapshot};
pub use memory::{
    InMemoryCartStore, InMemoryInventoryStore, InMemoryOrderStore, InMemoryUserDirectory,
};
pub use order::{IdempotencyRecord, OrderStore};
pub use postgres::{
    PostgresCartStore, PostgresInventoryStore, PostgresOrderStore, PostgresUserDirectory,
    run_migrations,
};
pub use user::{UserDirectory, UserRecord};
