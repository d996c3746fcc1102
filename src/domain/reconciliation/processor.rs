//! Reconciliation processor - orchestrates idempotent webhook handling.
//!
//! This module coordinates signature verification, the notification
//! ledger, and the subscription state machine, ensuring each gateway
//! event transitions a subscription exactly once.
//!
//! ## Pipeline
//!
//! Each step is a hard boundary; failing a step never leaks into the next:
//!
//! 1. Extract required fields (fail fast, all missing keys reported)
//! 2. Verify the signature (before any persistent write)
//! 3. Record the event in the ledger, or detect a duplicate
//! 4. Look up the subscription by order id
//! 5. Decide and commit the transition atomically with the ledger mark
//! 6. Return side-effect commands for post-commit dispatch
//!
//! ## Race Condition Handling
//!
//! When multiple deliveries of the same event arrive simultaneously the
//! first ledger insert wins (unique constraint on the event id); later
//! writers observe the existing record. A record that exists but was
//! never settled is RESUMED rather than skipped - that is the crash- and
//! retry-recovery path, since the record is created before business logic
//! runs.

use std::sync::Arc;

use serde_json::Value;

use crate::domain::billing::{SideEffect, Subscription, SubscriptionStatus};
use crate::domain::foundation::Timestamp;
use crate::ports::{NotificationLedger, NotificationRecord, RecordOutcome, SubscriptionStore};

use super::errors::WebhookError;
use super::notification::GatewayNotification;
use super::signature::SignatureVerifier;
use super::transition::{decide, PaymentAction, TransitionDecision};

/// Result of reconciling one notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// A state transition was committed.
    Applied {
        order_id: String,
        new_status: SubscriptionStatus,
        /// Dispatched by the caller after this call returns.
        side_effects: Vec<SideEffect>,
    },

    /// The event carried no new information; the record was marked
    /// processed and nothing else changed.
    Ignored {
        order_id: String,
        reason: &'static str,
    },

    /// The event contradicted the subscription state; logged for
    /// operators, acknowledged to the gateway.
    Anomaly {
        order_id: String,
        reason: &'static str,
    },

    /// This event id was already handled. Respond success so the gateway
    /// stops retrying.
    Duplicate,

    /// No subscription matches the order id. Acknowledged; retrying
    /// cannot fix a local lookup miss.
    UnknownOrder { order_id: String },
}

/// Processes gateway notifications exactly once.
///
/// Construction takes the verifier by value (it is cheap and immutable)
/// and the persistence ports as shared trait objects.
pub struct ReconciliationProcessor {
    verifier: SignatureVerifier,
    ledger: Arc<dyn NotificationLedger>,
    store: Arc<dyn SubscriptionStore>,
}

impl ReconciliationProcessor {
    /// Creates a new processor.
    pub fn new(
        verifier: SignatureVerifier,
        ledger: Arc<dyn NotificationLedger>,
        store: Arc<dyn SubscriptionStore>,
    ) -> Self {
        Self {
            verifier,
            ledger,
            store,
        }
    }

    /// Process one raw notification payload.
    ///
    /// # Errors
    ///
    /// - `MissingFields` / `ParseError` - malformed payload, nothing written
    /// - `InvalidSignature` - authentication failure, nothing written
    /// - `Database` - transient failure after the ledger insert; the
    ///   record stays unsettled and the retry shell re-drives it
    pub async fn process(&self, raw: &Value) -> Result<ReconcileOutcome, WebhookError> {
        // 1. Extract required fields - no partial processing
        let notification = GatewayNotification::from_value(raw)?;

        // 2. Authenticate before any persistent write
        self.verifier.verify(&notification)?;

        // 3. Record or detect duplicate, keyed by the provider event id
        let record = NotificationRecord::received(
            notification.transaction_id.clone(),
            notification.order_id.clone(),
            raw.clone(),
        );
        match self.ledger.record_or_detect(record).await? {
            RecordOutcome::Inserted => {}
            RecordOutcome::Duplicate(existing) if existing.is_settled() => {
                tracing::debug!(
                    event_id = %notification.transaction_id,
                    order_id = %notification.order_id,
                    "duplicate notification short-circuited"
                );
                return Ok(ReconcileOutcome::Duplicate);
            }
            RecordOutcome::Duplicate(_) => {
                // Unsettled record from a crashed or failed attempt - resume
                tracing::info!(
                    event_id = %notification.transaction_id,
                    order_id = %notification.order_id,
                    "resuming unsettled notification"
                );
            }
        }

        // 4. Correlate to a subscription
        let subscription = match self
            .store
            .find_by_order_id(&notification.order_id)
            .await?
        {
            Some(subscription) => subscription,
            None => {
                tracing::warn!(
                    event_id = %notification.transaction_id,
                    order_id = %notification.order_id,
                    "notification references unknown order"
                );
                self.ledger
                    .mark_processed(&notification.transaction_id)
                    .await?;
                return Ok(ReconcileOutcome::UnknownOrder {
                    order_id: notification.order_id,
                });
            }
        };

        // 5. Decide and commit
        match decide(subscription.status, notification.transaction_status) {
            TransitionDecision::Apply(action) => {
                self.apply(subscription, action, &notification).await
            }
            TransitionDecision::Ignore { reason } => {
                tracing::debug!(
                    event_id = %notification.transaction_id,
                    order_id = %notification.order_id,
                    reason,
                    "notification ignored"
                );
                self.ledger
                    .mark_processed(&notification.transaction_id)
                    .await?;
                Ok(ReconcileOutcome::Ignored {
                    order_id: notification.order_id,
                    reason,
                })
            }
            TransitionDecision::Anomaly { reason } => {
                tracing::warn!(
                    event_id = %notification.transaction_id,
                    order_id = %notification.order_id,
                    status = ?subscription.status,
                    gateway_status = notification.transaction_status.as_str(),
                    reason,
                    "anomalous notification not applied"
                );
                self.ledger
                    .mark_processed(&notification.transaction_id)
                    .await?;
                Ok(ReconcileOutcome::Anomaly {
                    order_id: notification.order_id,
                    reason,
                })
            }
        }
    }

    /// Apply a decided action: mutate a copy of the aggregate, commit it
    /// atomically with the ledger mark, and build the side effects.
    async fn apply(
        &self,
        mut subscription: Subscription,
        action: PaymentAction,
        notification: &GatewayNotification,
    ) -> Result<ReconcileOutcome, WebhookError> {
        let side_effects = match &action {
            PaymentAction::Activate => {
                subscription
                    .activate(
                        notification.transaction_id.clone(),
                        notification.payment_type.clone(),
                        Timestamp::now(),
                    )
                    .map_err(|e| WebhookError::IllegalTransition(e.to_string()))?;

                // ends_at is set by activate
                let ends_at = subscription.ends_at.unwrap_or_else(Timestamp::now);
                vec![
                    SideEffect::PaymentReceived {
                        user_id: subscription.user_id.clone(),
                        order_id: subscription.order_id.clone(),
                        gross_amount: notification.gross_amount.clone(),
                        payment_type: notification.payment_type.clone(),
                    },
                    SideEffect::SubscriptionActivated {
                        user_id: subscription.user_id.clone(),
                        order_id: subscription.order_id.clone(),
                        ends_at,
                    },
                ]
            }
            PaymentAction::Fail { reason } => {
                subscription
                    .fail(*reason)
                    .map_err(|e| WebhookError::IllegalTransition(e.to_string()))?;
                vec![SideEffect::PaymentFailed {
                    user_id: subscription.user_id.clone(),
                    order_id: subscription.order_id.clone(),
                    reason: reason.to_string(),
                }]
            }
            PaymentAction::Cancel { reason } => {
                subscription
                    .cancel(*reason)
                    .map_err(|e| WebhookError::IllegalTransition(e.to_string()))?;
                vec![SideEffect::SubscriptionCancelled {
                    user_id: subscription.user_id.clone(),
                    order_id: subscription.order_id.clone(),
                    reason: reason.to_string(),
                }]
            }
        };

        // Subscription update + ledger mark in one transaction
        self.store
            .commit_transition(&subscription, &notification.transaction_id)
            .await?;

        tracing::info!(
            event_id = %notification.transaction_id,
            order_id = %subscription.order_id,
            new_status = subscription.status.as_str(),
            "subscription transition committed"
        );

        Ok(ReconcileOutcome::Applied {
            order_id: subscription.order_id.to_string(),
            new_status: subscription.status,
            side_effects,
        })
    }
}
