//! Deferred-processing shell for webhook reconciliation.
//!
//! An at-least-once wrapper around the webhook handler: payloads queued
//! for background processing are driven through bounded retries with
//! exponential backoff and a per-attempt timeout. On exhaustion the
//! notification is marked terminally failed in the ledger and an
//! operator alert is raised.
//!
//! The HTTP endpoint processes notifications synchronously when it can;
//! this shell re-drives work that failed transiently, without the
//! gateway's retry cadence dictating ours.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tokio::time;

use crate::application::handlers::{ProcessWebhookCommand, ProcessWebhookHandler};
use crate::domain::reconciliation::{ReconcileOutcome, WebhookError};
use crate::ports::{AlertSink, NotificationLedger, OperatorAlert};

use super::retry::RetryPolicy;

/// Background worker that re-drives webhook processing with retries.
pub struct WebhookDispatchShell {
    handler: Arc<ProcessWebhookHandler>,
    ledger: Arc<dyn NotificationLedger>,
    alerts: Arc<dyn AlertSink>,
    policy: RetryPolicy,
}

impl WebhookDispatchShell {
    /// Creates a shell with the default retry policy.
    pub fn new(
        handler: Arc<ProcessWebhookHandler>,
        ledger: Arc<dyn NotificationLedger>,
        alerts: Arc<dyn AlertSink>,
    ) -> Self {
        Self {
            handler,
            ledger,
            alerts,
            policy: RetryPolicy::default(),
        }
    }

    /// Creates a shell with a custom retry policy.
    pub fn with_policy(
        handler: Arc<ProcessWebhookHandler>,
        ledger: Arc<dyn NotificationLedger>,
        alerts: Arc<dyn AlertSink>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            handler,
            ledger,
            alerts,
            policy,
        }
    }

    /// Run the worker loop until the queue closes or shutdown is signalled.
    pub async fn run(&self, mut queue: mpsc::Receiver<Value>, mut shutdown: watch::Receiver<bool>) {
        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        return;
                    }
                }

                payload = queue.recv() => {
                    match payload {
                        // Failures are fully handled inside (logged,
                        // marked, alerted); nothing to propagate
                        Some(payload) => {
                            let _ = self.process_with_retries(payload).await;
                        }
                        None => return,
                    }
                }
            }
        }
    }

    /// Drive one payload through the retry budget.
    ///
    /// Returns the first successful outcome, or the last error after the
    /// budget is spent. Non-retryable errors (bad signature, malformed
    /// payload) fail on the first attempt without burning the budget.
    pub async fn process_with_retries(
        &self,
        payload: Value,
    ) -> Result<ReconcileOutcome, WebhookError> {
        let event_id = string_field(&payload, "transaction_id");
        let order_id = string_field(&payload, "order_id");

        let mut last_error = None;

        for attempt in 1..=self.policy.max_attempts {
            let cmd = ProcessWebhookCommand {
                payload: payload.clone(),
            };

            let result = time::timeout(self.policy.attempt_timeout, self.handler.handle(cmd)).await;
            let error = match result {
                Ok(Ok(outcome)) => return Ok(outcome),
                Ok(Err(e)) if !e.is_retryable() => return Err(e),
                Ok(Err(e)) => e,
                Err(_) => WebhookError::Timeout(self.policy.attempt_timeout.as_secs()),
            };

            tracing::warn!(
                event_id = event_id.as_deref().unwrap_or("unknown"),
                order_id = order_id.as_deref().unwrap_or("unknown"),
                attempt,
                max_attempts = self.policy.max_attempts,
                error = %error,
                "webhook processing attempt failed"
            );
            last_error = Some(error);

            if attempt < self.policy.max_attempts {
                time::sleep(self.policy.delay_for(attempt)).await;
            }
        }

        let error = last_error.unwrap_or(WebhookError::Timeout(0));
        self.give_up(event_id, order_id, &error).await;
        Err(error)
    }

    /// Budget exhausted: mark the ledger record terminally failed and
    /// raise an operator alert.
    async fn give_up(
        &self,
        event_id: Option<String>,
        order_id: Option<String>,
        error: &WebhookError,
    ) {
        tracing::error!(
            event_id = event_id.as_deref().unwrap_or("unknown"),
            order_id = order_id.as_deref().unwrap_or("unknown"),
            attempts = self.policy.max_attempts,
            error = %error,
            "webhook reconciliation permanently failed"
        );

        if let Some(event_id) = &event_id {
            if let Err(e) = self.ledger.mark_failed(event_id, &error.to_string()).await {
                tracing::error!(
                    %event_id,
                    error = %e,
                    "could not mark notification terminally failed"
                );
            }
        }

        let alert = OperatorAlert::reconciliation_failed(
            event_id.unwrap_or_else(|| "unknown".to_string()),
            order_id,
            error.to_string(),
            self.policy.max_attempts,
        );
        if let Err(e) = self.alerts.raise(alert).await {
            tracing::error!(error = %e, "could not raise operator alert");
        }
    }
}

fn string_field(payload: &Value, key: &str) -> Option<String> {
    payload.get(key).and_then(Value::as_str).map(String::from)
}
