//! Item Models

use serde::{Deserialize, Serialize};
use validator::Validate;

pub const MIN_PRICE: i64 = 1;
pub const MAX_PRICE: i64 = 999_999;

/// A listed item. `user_id` is the owning seller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: i64,
    pub name: String,
    pub price: i64,
    pub description: Option<String>,
    pub sold_out: bool,
    pub user_id: i64,
}

/// Create item request body
#[derive(Debug, Deserialize, Validate)]
pub struct CreateItemRequest {
    #[validate(length(min = 2, message = "name must be at least 2 characters"))]
    pub name: String,
    #[validate(range(
        min = MIN_PRICE,
        max = MAX_PRICE,
        message = "price must be between 1 and 999999"
    ))]
    pub price: i64,
    pub description: Option<String>,
}

/// Partial update; absent fields are left unchanged.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateItemRequest {
    #[validate(length(min = 2, message = "name must be at least 2 characters"))]
    pub name: Option<String>,
    #[validate(range(
        min = MIN_PRICE,
        max = MAX_PRICE,
        message = "price must be between 1 and 999999"
    ))]
    pub price: Option<i64>,
    pub description: Option<String>,
    pub sold_out: Option<bool>,
}

impl UpdateItemRequest {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.price.is_none()
            && self.description.is_none()
            && self.sold_out.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_item_validation() {
        let ok = CreateItemRequest {
            name: "Lamp".to_string(),
            price: 1200,
            description: None,
        };
        assert!(ok.validate().is_ok());

        let short_name = CreateItemRequest {
            name: "L".to_string(),
            ..ok
        };
        assert!(short_name.validate().is_err());

        for price in [0, MAX_PRICE + 1, -5] {
            let bad = CreateItemRequest {
                name: "Lamp".to_string(),
                price,
                description: None,
            };
            assert!(bad.validate().is_err(), "price {price} should be rejected");
        }

        let edge = CreateItemRequest {
            name: "Lamp".to_string(),
            price: MIN_PRICE,
            description: Some(String::new()),
        };
        assert!(edge.validate().is_ok());
    }

    #[test]
    fn test_update_item_validation_only_checks_present_fields() {
        assert!(UpdateItemRequest::default().validate().is_ok());
        assert!(UpdateItemRequest::default().is_empty());

        let bad = UpdateItemRequest {
            price: Some(0),
            ..Default::default()
        };
        assert!(bad.validate().is_err());

        let sold: UpdateItemRequest = serde_json::from_str(r#"{"soldOut": true}"#).unwrap();
        assert_eq!(sold.sold_out, Some(true));
        assert!(!sold.is_empty());
    }

    #[test]
    fn test_item_serializes_camel_case() {
        let item = Item {
            id: 1,
            name: "Lamp".to_string(),
            price: 1200,
            description: None,
            sold_out: false,
            user_id: 7,
        };
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["soldOut"], false);
        assert_eq!(json["userId"], 7);
    }
}
