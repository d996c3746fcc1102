//! Webhook error types for gateway notification handling.
//!
//! Defines all error conditions that can occur during reconciliation,
//! with HTTP status code mapping and retryability semantics.

use axum::http::StatusCode;
use thiserror::Error;

/// Errors that occur during webhook processing.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Signature verification failed, or the server key is unset.
    /// Verification fails closed: a misconfigured secret rejects, never accepts.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Required fields missing from the notification payload.
    /// Carries every absent key so the gateway operator sees the full list.
    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    /// Payload was not a JSON object or a field had the wrong shape.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Caller address not on the configured allowlist.
    #[error("Source address not allowed")]
    ForbiddenSource,

    /// Notification references an order id with no subscription.
    /// Acknowledged as success; retrying cannot resolve a local lookup miss.
    #[error("Unknown order: {0}")]
    UnknownOrder(String),

    /// Event does not apply to the subscription's current state.
    /// Logged as an anomaly, acknowledged as success.
    #[error("Illegal transition: {0}")]
    IllegalTransition(String),

    /// Datastore operation failed.
    #[error("Database error: {0}")]
    Database(String),

    /// Processing attempt exceeded its wall-clock budget.
    #[error("Attempt timed out after {0}s")]
    Timeout(u64),
}

impl WebhookError {
    /// Returns true if the dispatch shell should retry this failure.
    ///
    /// Retryable errors are temporary: the datastore was unavailable or the
    /// attempt timed out. Authentication and validation failures are final.
    pub fn is_retryable(&self) -> bool {
        matches!(self, WebhookError::Database(_) | WebhookError::Timeout(_))
    }

    /// Maps the error to the HTTP status returned to the gateway.
    ///
    /// Status codes steer the gateway's retry behaviour:
    /// - 2xx: acknowledged, no retry (includes anomalies we cannot resolve)
    /// - 4xx: rejected, no retry
    /// - 5xx: transient, gateway retries
    pub fn status_code(&self) -> StatusCode {
        match self {
            // Auth failure - reject, don't retry
            WebhookError::InvalidSignature => StatusCode::UNAUTHORIZED,

            // Malformed input - reject, don't retry
            WebhookError::MissingFields(_) | WebhookError::ParseError(_) => {
                StatusCode::BAD_REQUEST
            }

            // Allowlist gate
            WebhookError::ForbiddenSource => StatusCode::FORBIDDEN,

            // Anomalies we acknowledge so the gateway stops retrying
            WebhookError::UnknownOrder(_) | WebhookError::IllegalTransition(_) => StatusCode::OK,

            // Transient - gateway retries
            WebhookError::Database(_) | WebhookError::Timeout(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<crate::domain::foundation::DomainError> for WebhookError {
    fn from(err: crate::domain::foundation::DomainError) -> Self {
        WebhookError::Database(err.to_string())
    }
}
