//! Wire types for the webhook endpoints.

use serde::Serialize;

/// Body for a successfully handled notification.
#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub status: &'static str,
}

impl WebhookAck {
    pub fn ok() -> Self {
        Self { status: "ok" }
    }
}

/// Body for an idempotent duplicate.
#[derive(Debug, Serialize)]
pub struct AlreadyProcessed {
    pub message: &'static str,
}

impl AlreadyProcessed {
    pub fn new() -> Self {
        Self {
            message: "Already processed",
        }
    }
}

impl Default for AlreadyProcessed {
    fn default() -> Self {
        Self::new()
    }
}

/// Error body; `missing_fields` is present only for validation failures.
#[derive(Debug, Serialize)]
pub struct WebhookErrorBody {
    pub error: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing_fields: Option<Vec<&'static str>>,
}

impl WebhookErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            missing_fields: None,
        }
    }

    pub fn missing(fields: Vec<&'static str>) -> Self {
        Self {
            error: "Missing required fields".to_string(),
            missing_fields: Some(fields),
        }
    }
}
