//! NotificationLedger port - durable record of every inbound gateway event.
//!
//! The ledger enables idempotent webhook handling: each notification is
//! recorded by its provider event id BEFORE any business logic runs, so a
//! crash mid-processing leaves an auditable, resumable trace, and a
//! duplicate delivery is detected instead of reprocessed.
//!
//! ## Why Notification Idempotency Matters
//!
//! The gateway may deliver the same notification multiple times due to:
//! - Network timeouts
//! - 5xx responses from our endpoint (triggers retry)
//! - Our endpoint returning success that the gateway never received
//!
//! Two near-simultaneous deliveries of the same event must not both apply a
//! state transition; the second writer must take the "already exists"
//! branch. Implementations back this with a uniqueness constraint on the
//! event-id column and a conflict-handling insert.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainError, Timestamp};

/// A recorded gateway notification.
///
/// Records are append-only: after creation the only mutations are the
/// processed mark (success) and the terminal-failure mark. Never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecord {
    /// Provider event id (gateway transaction id) - the idempotency key.
    pub event_id: String,

    /// Originating provider, e.g. "midtrans".
    pub provider: String,

    /// Order id correlating this event to a subscription.
    pub order_id: String,

    /// Raw payload preserved verbatim for audit and replay.
    pub payload: serde_json::Value,

    /// When the notification arrived.
    pub received_at: Timestamp,

    /// When processing completed successfully. Null until handled.
    pub processed_at: Option<Timestamp>,

    /// When the retry budget was exhausted. Terminal-failure marker.
    pub failed_at: Option<Timestamp>,

    /// Last error observed, set only on terminal failure.
    pub last_error: Option<String>,
}

impl NotificationRecord {
    /// Creates a fresh, unprocessed record for an inbound notification.
    pub fn received(
        event_id: impl Into<String>,
        order_id: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            provider: "midtrans".to_string(),
            order_id: order_id.into(),
            payload,
            received_at: Timestamp::now(),
            processed_at: None,
            failed_at: None,
            last_error: None,
        }
    }

    /// Whether this record has been handled (successfully or terminally).
    pub fn is_settled(&self) -> bool {
        self.processed_at.is_some() || self.failed_at.is_some()
    }
}

/// Result of attempting to record a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    /// First time seeing this event; the record was inserted.
    Inserted,
    /// The event was already recorded; carries the existing record.
    Duplicate(NotificationRecord),
}

/// Port for the durable notification ledger.
///
/// Implementations must make `record_or_detect` atomic with respect to
/// concurrent deliveries of the same event (unique constraint plus
/// `ON CONFLICT DO NOTHING` or an equivalent transactional guard).
#[async_trait]
pub trait NotificationLedger: Send + Sync {
    /// Record a notification, or detect that its event id already exists.
    async fn record_or_detect(
        &self,
        record: NotificationRecord,
    ) -> Result<RecordOutcome, DomainError>;

    /// Find a record by provider event id.
    async fn find_by_event_id(
        &self,
        event_id: &str,
    ) -> Result<Option<NotificationRecord>, DomainError>;

    /// Records that are neither processed nor terminally failed, oldest
    /// first. Used at startup to re-drive work interrupted by a crash.
    async fn find_unsettled(&self, limit: u32) -> Result<Vec<NotificationRecord>, DomainError>;

    /// Mark a record as successfully processed.
    async fn mark_processed(&self, event_id: &str) -> Result<(), DomainError>;

    /// Mark a record as terminally failed with the last error observed.
    ///
    /// Called only after the retry budget is exhausted.
    async fn mark_failed(&self, event_id: &str, error: &str) -> Result<(), DomainError>;
}
