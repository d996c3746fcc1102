//! Notification and alerting adapters.
//!
//! Email delivery itself is the notification service's concern; this
//! service only enqueues jobs. `QueueDispatcher` hands side effects to a
//! channel drained by the delivery worker, and `TracingAlertSink` emits
//! operator alerts as structured error logs for the monitoring stack.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::domain::billing::SideEffect;
use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::{AlertSink, OperatorAlert, SideEffectDispatcher};

/// Dispatcher backed by an in-process job queue.
pub struct QueueDispatcher {
    queue: mpsc::Sender<SideEffect>,
}

impl QueueDispatcher {
    /// Creates a dispatcher and the receiving end for the delivery worker.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<SideEffect>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { queue: tx }, rx)
    }
}

#[async_trait]
impl SideEffectDispatcher for QueueDispatcher {
    async fn dispatch(&self, effect: SideEffect) -> Result<(), DomainError> {
        let kind = effect.kind();
        self.queue.send(effect).await.map_err(|_| {
            DomainError::new(
                ErrorCode::DispatchError,
                format!("notification queue closed while enqueueing {}", kind),
            )
        })
    }
}

/// Alert sink that emits structured error logs.
///
/// The monitoring stack pages on these; no direct integration is needed
/// here.
#[derive(Default)]
pub struct TracingAlertSink;

impl TracingAlertSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AlertSink for TracingAlertSink {
    async fn raise(&self, alert: OperatorAlert) -> Result<(), DomainError> {
        tracing::error!(
            summary = %alert.summary,
            event_id = alert.event_id.as_deref().unwrap_or("unknown"),
            order_id = alert.order_id.as_deref().unwrap_or("unknown"),
            error = %alert.error,
            attempts = alert.attempts,
            "OPERATOR ALERT"
        );
        Ok(())
    }
}

/// Drain the notification queue, logging each job.
///
/// Stands in for the email delivery worker: the platform's notification
/// service consumes these jobs in production.
pub async fn run_delivery_logger(mut queue: mpsc::Receiver<SideEffect>) {
    while let Some(effect) = queue.recv().await {
        tracing::info!(
            kind = effect.kind(),
            order_id = %effect.order_id(),
            "notification job dequeued for delivery"
        );
    }
}
