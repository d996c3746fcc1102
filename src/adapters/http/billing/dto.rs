//! Wire types for the billing endpoints.

use serde::{Deserialize, Serialize};

use crate::domain::billing::Subscription;

/// Request body for checkout initiation.
#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub user_id: String,
    pub package_id: i64,
}

/// Response body for a created checkout.
#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub order_id: String,
    pub gross_amount: String,
    pub status: String,
}

impl CheckoutResponse {
    pub fn from_subscription(subscription: &Subscription, gross_amount: String) -> Self {
        Self {
            order_id: subscription.order_id.to_string(),
            gross_amount,
            status: subscription.status.as_str().to_string(),
        }
    }
}

/// Error body with a stable machine-readable code.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: &'static str, message: impl Into<String>) -> Self {
        Self {
            error,
            message: message.into(),
        }
    }
}
