//! Checkout state machine.

use serde::{Deserialize, Serialize};

/// The state of a checkout attempt in its lifecycle.
///
/// State transitions:
/// ```text
/// Started ──► CartLoaded ──► StockReserved ──► OrderPersisted ──► CartCleared
///    │             │               │                 │
///    └─────────────┴───────────────┴─────────────────┴──► Failed
/// ```
///
/// A cart-clear failure does not move the attempt to `Failed`; the order
/// already exists at that point and the stale cart is only logged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum CheckoutState {
    /// Attempt accepted, nothing loaded yet.
    #[default]
    Started,

    /// Cart found and validated as non-empty.
    CartLoaded,

    /// Every cart line has been atomically decremented from stock.
    StockReserved,

    /// The order document has been written.
    OrderPersisted,

    /// The cart has been emptied (terminal state).
    CartCleared,

    /// The attempt failed and any reserved stock was handled (terminal state).
    Failed {
        /// Short machine-readable reason, e.g. an error code.
        reason: String,
    },
}

impl CheckoutState {
    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, CheckoutState::CartCleared | CheckoutState::Failed { .. })
    }

    /// Returns true if stock is currently held by this attempt.
    ///
    /// Only `StockReserved` holds stock that is not yet accounted for by a
    /// persisted order; a failure from this state must restore it.
    pub fn holds_stock(&self) -> bool {
        matches!(self, CheckoutState::StockReserved)
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutState::Started => "Started",
            CheckoutState::CartLoaded => "CartLoaded",
            CheckoutState::StockReserved => "StockReserved",
            CheckoutState::OrderPersisted => "OrderPersisted",
            CheckoutState::CartCleared => "CartCleared",
            CheckoutState::Failed { .. } => "Failed",
        }
    }
}

impl std::fmt::Display for CheckoutState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state_is_started() {
        assert_eq!(CheckoutState::default(), CheckoutState::Started);
    }

    #[test]
    fn test_is_terminal() {
        assert!(!CheckoutState::Started.is_terminal());
        assert!(!CheckoutState::CartLoaded.is_terminal());
        assert!(!CheckoutState::StockReserved.is_terminal());
        assert!(!CheckoutState::OrderPersisted.is_terminal());
        assert!(CheckoutState::CartCleared.is_terminal());
        assert!(
            CheckoutState::Failed {
                reason: "INSUFFICIENT_STOCK".to_string()
            }
            .is_terminal()
        );
    }

    #[test]
    fn test_holds_stock() {
        assert!(!CheckoutState::Started.holds_stock());
        assert!(!CheckoutState::CartLoaded.holds_stock());
        assert!(CheckoutState::StockReserved.holds_stock());
        assert!(!CheckoutState::OrderPersisted.holds_stock());
        assert!(!CheckoutState::CartCleared.holds_stock());
    }

    #[test]
    fn test_display() {
        assert_eq!(CheckoutState::StockReserved.to_string(), "StockReserved");
        assert_eq!(
            CheckoutState::Failed {
                reason: "x".to_string()
            }
            .to_string(),
            "Failed"
        );
    }
}
