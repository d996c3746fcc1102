//! In-memory port implementations.
//!
//! Back the integration tests and the local sandbox wiring. Semantics
//! mirror the PostgreSQL adapters: the ledger enforces event-id
//! uniqueness, and `commit_transition` applies both writes under one lock
//! so tests observe the same all-or-nothing behaviour as a transaction.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::billing::{SideEffect, Subscription};
use crate::domain::foundation::{DomainError, ErrorCode, Timestamp};
use crate::ports::{
    AlertSink, NotificationLedger, NotificationRecord, OperatorAlert, RecordOutcome,
    SideEffectDispatcher, SubscriptionStore,
};

/// In-memory notification ledger.
#[derive(Default)]
pub struct InMemoryNotificationLedger {
    records: Mutex<HashMap<String, NotificationRecord>>,
}

impl InMemoryNotificationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of recorded notifications.
    pub fn record_count(&self) -> usize {
        self.records.lock().unwrap().len()
    }
}

#[async_trait]
impl NotificationLedger for InMemoryNotificationLedger {
    async fn record_or_detect(
        &self,
        record: NotificationRecord,
    ) -> Result<RecordOutcome, DomainError> {
        let mut records = self.records.lock().unwrap();
        if let Some(existing) = records.get(&record.event_id) {
            Ok(RecordOutcome::Duplicate(existing.clone()))
        } else {
            records.insert(record.event_id.clone(), record);
            Ok(RecordOutcome::Inserted)
        }
    }

    async fn find_by_event_id(
        &self,
        event_id: &str,
    ) -> Result<Option<NotificationRecord>, DomainError> {
        Ok(self.records.lock().unwrap().get(event_id).cloned())
    }

    async fn find_unsettled(&self, limit: u32) -> Result<Vec<NotificationRecord>, DomainError> {
        let records = self.records.lock().unwrap();
        let mut unsettled: Vec<NotificationRecord> = records
            .values()
            .filter(|r| !r.is_settled())
            .cloned()
            .collect();
        unsettled.sort_by_key(|r| r.received_at);
        unsettled.truncate(limit as usize);
        Ok(unsettled)
    }

    async fn mark_processed(&self, event_id: &str) -> Result<(), DomainError> {
        let mut records = self.records.lock().unwrap();
        let record = records.get_mut(event_id).ok_or_else(|| {
            DomainError::new(ErrorCode::NotificationNotFound, "no such notification")
        })?;
        record.processed_at = Some(Timestamp::now());
        Ok(())
    }

    async fn mark_failed(&self, event_id: &str, error: &str) -> Result<(), DomainError> {
        let mut records = self.records.lock().unwrap();
        let record = records.get_mut(event_id).ok_or_else(|| {
            DomainError::new(ErrorCode::NotificationNotFound, "no such notification")
        })?;
        record.failed_at = Some(Timestamp::now());
        record.last_error = Some(error.to_string());
        Ok(())
    }
}

/// In-memory subscription store.
///
/// Holds a reference to the ledger so `commit_transition` can apply the
/// subscription update and the processed mark together.
pub struct InMemorySubscriptionStore {
    subscriptions: Mutex<HashMap<String, Subscription>>,
    ledger: std::sync::Arc<InMemoryNotificationLedger>,
}

impl InMemorySubscriptionStore {
    pub fn new(ledger: std::sync::Arc<InMemoryNotificationLedger>) -> Self {
        Self {
            subscriptions: Mutex::new(HashMap::new()),
            ledger,
        }
    }
}

#[async_trait]
impl SubscriptionStore for InMemorySubscriptionStore {
    async fn insert(&self, subscription: &Subscription) -> Result<(), DomainError> {
        let mut subscriptions = self.subscriptions.lock().unwrap();
        let key = subscription.order_id.to_string();
        if subscriptions.contains_key(&key) {
            return Err(DomainError::new(
                ErrorCode::DuplicateOrder,
                format!("Order {} already exists", key),
            ));
        }
        subscriptions.insert(key, subscription.clone());
        Ok(())
    }

    async fn find_by_order_id(
        &self,
        order_id: &str,
    ) -> Result<Option<Subscription>, DomainError> {
        Ok(self.subscriptions.lock().unwrap().get(order_id).cloned())
    }

    async fn update(&self, subscription: &Subscription) -> Result<(), DomainError> {
        let mut subscriptions = self.subscriptions.lock().unwrap();
        let key = subscription.order_id.to_string();
        if !subscriptions.contains_key(&key) {
            return Err(DomainError::new(
                ErrorCode::SubscriptionNotFound,
                format!("Order {} not found", key),
            ));
        }
        subscriptions.insert(key, subscription.clone());
        Ok(())
    }

    async fn commit_transition(
        &self,
        subscription: &Subscription,
        event_id: &str,
    ) -> Result<(), DomainError> {
        // Single lock section stands in for the database transaction
        {
            let mut subscriptions = self.subscriptions.lock().unwrap();
            subscriptions.insert(subscription.order_id.to_string(), subscription.clone());
        }
        self.ledger.mark_processed(event_id).await
    }

    async fn find_stale_pending(
        &self,
        cutoff: Timestamp,
    ) -> Result<Vec<Subscription>, DomainError> {
        Ok(self
            .subscriptions
            .lock()
            .unwrap()
            .values()
            .filter(|s| s.is_stale_pending(cutoff))
            .cloned()
            .collect())
    }

    async fn find_active_past_end(
        &self,
        now: Timestamp,
    ) -> Result<Vec<Subscription>, DomainError> {
        Ok(self
            .subscriptions
            .lock()
            .unwrap()
            .values()
            .filter(|s| s.is_past_period_end(now))
            .cloned()
            .collect())
    }
}

/// Dispatcher that records every side effect, for assertions in tests.
#[derive(Default)]
pub struct RecordingDispatcher {
    effects: Mutex<Vec<SideEffect>>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn effects(&self) -> Vec<SideEffect> {
        self.effects.lock().unwrap().clone()
    }

    pub fn kinds(&self) -> Vec<&'static str> {
        self.effects.lock().unwrap().iter().map(|e| e.kind()).collect()
    }
}

#[async_trait]
impl SideEffectDispatcher for RecordingDispatcher {
    async fn dispatch(&self, effect: SideEffect) -> Result<(), DomainError> {
        self.effects.lock().unwrap().push(effect);
        Ok(())
    }
}

/// Alert sink that records alerts, for assertions in tests.
#[derive(Default)]
pub struct RecordingAlertSink {
    alerts: Mutex<Vec<OperatorAlert>>,
}

impl RecordingAlertSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alerts(&self) -> Vec<OperatorAlert> {
        self.alerts.lock().unwrap().clone()
    }
}

#[async_trait]
impl AlertSink for RecordingAlertSink {
    async fn raise(&self, alert: OperatorAlert) -> Result<(), DomainError> {
        self.alerts.lock().unwrap().push(alert);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::BillingInterval;
    use crate::domain::foundation::{OrderId, PackageId, SubscriptionId, UserId};
    use serde_json::json;
    use std::sync::Arc;

    fn subscription(order_id: &str) -> Subscription {
        Subscription::create_pending(
            SubscriptionId::new(),
            UserId::new("1").unwrap(),
            PackageId::new(2),
            BillingInterval::Monthly,
            OrderId::new(order_id).unwrap(),
        )
    }

    // ══════════════════════════════════════════════════════════════
    // Ledger Tests
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn ledger_inserts_then_detects_duplicate() {
        let ledger = InMemoryNotificationLedger::new();

        let first = ledger
            .record_or_detect(NotificationRecord::received("tx-1", "SUB-1-2-1", json!({})))
            .await
            .unwrap();
        assert_eq!(first, RecordOutcome::Inserted);

        let second = ledger
            .record_or_detect(NotificationRecord::received("tx-1", "SUB-1-2-1", json!({})))
            .await
            .unwrap();
        assert!(matches!(second, RecordOutcome::Duplicate(_)));
        assert_eq!(ledger.record_count(), 1);
    }

    #[tokio::test]
    async fn ledger_marks_processed_and_failed() {
        let ledger = InMemoryNotificationLedger::new();
        ledger
            .record_or_detect(NotificationRecord::received("tx-1", "SUB-1-2-1", json!({})))
            .await
            .unwrap();

        ledger.mark_processed("tx-1").await.unwrap();
        let record = ledger.find_by_event_id("tx-1").await.unwrap().unwrap();
        assert!(record.processed_at.is_some());

        ledger.mark_failed("tx-1", "boom").await.unwrap();
        let record = ledger.find_by_event_id("tx-1").await.unwrap().unwrap();
        assert_eq!(record.last_error, Some("boom".to_string()));
    }

    #[tokio::test]
    async fn ledger_mark_on_missing_record_errors() {
        let ledger = InMemoryNotificationLedger::new();
        assert!(ledger.mark_processed("tx-missing").await.is_err());
    }

    #[tokio::test]
    async fn ledger_find_unsettled_skips_settled_records() {
        let ledger = InMemoryNotificationLedger::new();
        for event_id in ["tx-1", "tx-2", "tx-3"] {
            ledger
                .record_or_detect(NotificationRecord::received(event_id, "SUB-1-2-1", json!({})))
                .await
                .unwrap();
        }
        ledger.mark_processed("tx-1").await.unwrap();
        ledger.mark_failed("tx-2", "gave up").await.unwrap();

        let unsettled = ledger.find_unsettled(10).await.unwrap();
        assert_eq!(unsettled.len(), 1);
        assert_eq!(unsettled[0].event_id, "tx-3");
    }

    // ══════════════════════════════════════════════════════════════
    // Store Tests
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn store_rejects_duplicate_order_id() {
        let ledger = Arc::new(InMemoryNotificationLedger::new());
        let store = InMemorySubscriptionStore::new(ledger);

        store.insert(&subscription("SUB-1-2-1")).await.unwrap();
        let err = store.insert(&subscription("SUB-1-2-1")).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::DuplicateOrder);
    }

    #[tokio::test]
    async fn commit_transition_updates_both_sides() {
        let ledger = Arc::new(InMemoryNotificationLedger::new());
        let store = InMemorySubscriptionStore::new(ledger.clone());

        let mut sub = subscription("SUB-1-2-2");
        store.insert(&sub).await.unwrap();
        ledger
            .record_or_detect(NotificationRecord::received("tx-2", "SUB-1-2-2", json!({})))
            .await
            .unwrap();

        sub.activate("tx-2".to_string(), "gopay".to_string(), Timestamp::now())
            .unwrap();
        store.commit_transition(&sub, "tx-2").await.unwrap();

        let stored = store.find_by_order_id("SUB-1-2-2").await.unwrap().unwrap();
        assert_eq!(stored.transaction_id, Some("tx-2".to_string()));
        assert!(ledger
            .find_by_event_id("tx-2")
            .await
            .unwrap()
            .unwrap()
            .processed_at
            .is_some());
    }

    // ══════════════════════════════════════════════════════════════
    // Recorder Tests
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn recording_dispatcher_collects_effects() {
        let dispatcher = RecordingDispatcher::new();
        dispatcher
            .dispatch(SideEffect::SubscriptionExpired {
                user_id: UserId::new("1").unwrap(),
                order_id: OrderId::new("SUB-1-2-3").unwrap(),
            })
            .await
            .unwrap();

        assert_eq!(dispatcher.kinds(), vec!["subscription_expired"]);
    }

    #[tokio::test]
    async fn recording_alert_sink_collects_alerts() {
        let sink = RecordingAlertSink::new();
        sink.raise(OperatorAlert::reconciliation_failed(
            "tx-1", None, "boom", 5,
        ))
        .await
        .unwrap();

        assert_eq!(sink.alerts().len(), 1);
        assert_eq!(sink.alerts()[0].attempts, 5);
    }
}
