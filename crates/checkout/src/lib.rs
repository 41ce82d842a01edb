//! Order placement pipeline for the checkout system.
//!
//! The pipeline loads the user's cart, reserves stock through atomic
//! conditional decrements, assembles an order from purchase-time
//! snapshots and clears the cart. Failures after reservation restore the
//! reserved stock; a restore that itself fails is reported as a
//! compensation failure instead of being silently dropped.

pub mod assembly;
pub mod coordinator;
pub mod error;
pub mod reservation;
pub mod state;

pub use assembly::OrderAssembler;
pub use coordinator::{CheckoutCoordinator, OrderReceipt, PlaceOrderRequest};
pub use error::{CheckoutError, Result};
pub use reservation::{ReservedLine, StockReservationService};
pub use state::CheckoutState;
