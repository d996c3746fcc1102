//! ProcessWebhookHandler - Command handler for inbound gateway notifications.
//!
//! Thin wrapper around the reconciliation processor that dispatches the
//! returned side effects AFTER the processor's transaction has committed.
//! Side-effect dispatch failures are logged and swallowed here - they are
//! retried by the queue independently and must never surface as a webhook
//! processing failure (which would make the gateway re-deliver a payment
//! event that was already applied).

use std::sync::Arc;

use crate::domain::reconciliation::{ReconcileOutcome, ReconciliationProcessor, WebhookError};
use crate::ports::SideEffectDispatcher;

/// Command to process one raw notification payload.
#[derive(Debug, Clone)]
pub struct ProcessWebhookCommand {
    /// The request body, parsed as JSON but otherwise untouched.
    pub payload: serde_json::Value,
}

/// Handler for processing gateway webhooks.
pub struct ProcessWebhookHandler {
    processor: Arc<ReconciliationProcessor>,
    dispatcher: Arc<dyn SideEffectDispatcher>,
}

impl ProcessWebhookHandler {
    pub fn new(
        processor: Arc<ReconciliationProcessor>,
        dispatcher: Arc<dyn SideEffectDispatcher>,
    ) -> Self {
        Self {
            processor,
            dispatcher,
        }
    }

    /// Reconcile the notification, then dispatch side effects post-commit.
    pub async fn handle(
        &self,
        cmd: ProcessWebhookCommand,
    ) -> Result<ReconcileOutcome, WebhookError> {
        let outcome = self.processor.process(&cmd.payload).await?;

        if let ReconcileOutcome::Applied { side_effects, .. } = &outcome {
            for effect in side_effects.clone() {
                let kind = effect.kind();
                let order_id = effect.order_id().to_string();
                if let Err(e) = self.dispatcher.dispatch(effect).await {
                    tracing::error!(
                        %order_id,
                        kind,
                        error = %e,
                        "side-effect dispatch failed; job queue will retry"
                    );
                }
            }
        }

        Ok(outcome)
    }
}
