//! AlertSink port - operator-visible alerts.
//!
//! Raised when a notification exhausts its retry budget. Delivery is the
//! monitoring stack's concern; this port only hands the alert over.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::DomainError;

/// An alert for the on-call operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorAlert {
    /// One-line summary, e.g. "webhook reconciliation permanently failed".
    pub summary: String,

    /// Provider event id of the notification involved, if known.
    pub event_id: Option<String>,

    /// Order id involved, if known.
    pub order_id: Option<String>,

    /// The final error that exhausted the budget.
    pub error: String,

    /// How many attempts were made.
    pub attempts: u32,
}

impl OperatorAlert {
    /// Alert for a notification that failed every retry.
    pub fn reconciliation_failed(
        event_id: impl Into<String>,
        order_id: Option<String>,
        error: impl Into<String>,
        attempts: u32,
    ) -> Self {
        Self {
            summary: "webhook reconciliation permanently failed".to_string(),
            event_id: Some(event_id.into()),
            order_id,
            error: error.into(),
            attempts,
        }
    }
}

/// Port for raising operator alerts.
#[async_trait]
pub trait AlertSink: Send + Sync {
    /// Hand an alert to the monitoring stack.
    async fn raise(&self, alert: OperatorAlert) -> Result<(), DomainError>;
}
