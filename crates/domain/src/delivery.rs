//! Delivery information captured at checkout.

use serde::{Deserialize, Serialize};

/// Destination address using province/ward administrative codes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryAddress {
    pub province_code: i32,
    pub province_name: String,
    pub ward_code: i32,
    pub ward_name: String,
    /// Street-level detail, free text.
    pub detail: Option<String>,
}

/// Receiver and destination for an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryInfo {
    pub receiver_name: String,
    pub receiver_phone: String,
    pub address: DeliveryAddress,
    /// Free-text note for the courier.
    pub note: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delivery_info_serialization_roundtrip() {
        let info = DeliveryInfo {
            receiver_name: "Alex Tran".to_string(),
            receiver_phone: "0900111222".to_string(),
            address: DeliveryAddress {
                province_code: 79,
                province_name: "Ho Chi Minh".to_string(),
                ward_code: 26734,
                ward_name: "Ward 4".to_string(),
                detail: Some("12 Nguyen Hue".to_string()),
            },
            note: None,
        };

        let json = serde_json::to_string(&info).unwrap();
        let deserialized: DeliveryInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(info, deserialized);
    }
}
