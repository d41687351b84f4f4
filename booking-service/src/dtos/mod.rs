//! Inbound request shapes.
//!
//! The legacy single-item booking shape is normalized into the line-item
//! list here, at the boundary; nothing past this module branches on it.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use validator::Validate;

use crate::models::supplier::DEFAULT_BOOKING_TYPE;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItemRequest {
    pub service_type: String,
    #[serde(default)]
    pub description: Option<String>,
    pub base_price: Decimal,
    #[serde(default)]
    pub retail_price: Option<Decimal>,
    #[serde(default)]
    pub quantity: Option<u32>,
    #[serde(default)]
    pub nights: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    #[validate(length(min = 1, message = "supplierId is required"))]
    pub supplier_id: String,
    #[validate(length(min = 1, message = "userId is required"))]
    pub user_id: String,
    #[serde(default = "default_booking_type")]
    pub booking_type: String,
    pub check_in_date: DateTime<Utc>,
    pub check_out_date: DateTime<Utc>,
    #[serde(default)]
    pub line_items: Vec<LineItemRequest>,
    #[serde(default)]
    pub metadata: serde_json::Value,

    // Legacy single-item shape, collapsed into `line_items` by
    // `normalized_line_items`.
    #[serde(default)]
    pub service_type: Option<String>,
    #[serde(default)]
    pub base_price: Option<Decimal>,
    #[serde(default)]
    pub retail_price: Option<Decimal>,
    #[serde(default)]
    pub quantity: Option<u32>,
    #[serde(default)]
    pub description: Option<String>,
}

fn default_booking_type() -> String {
    DEFAULT_BOOKING_TYPE.to_string()
}

impl CreateBookingRequest {
    /// The line items to price, with the legacy single-item fields folded
    /// in when the list is empty.
    pub fn normalized_line_items(&self) -> Vec<LineItemRequest> {
        if !self.line_items.is_empty() {
            return self.line_items.clone();
        }
        match (&self.service_type, self.base_price) {
            (Some(service_type), Some(base_price)) => vec![LineItemRequest {
                service_type: service_type.clone(),
                description: Some(
                    self.description
                        .clone()
                        .unwrap_or_else(|| service_type.clone()),
                ),
                base_price,
                retail_price: self.retail_price,
                quantity: Some(self.quantity.unwrap_or(1)),
                nights: None,
            }],
            _ => Vec::new(),
        }
    }
}
