//! Scheduled lifecycle sweeps.
//!
//! Two internal transitions are not gateway-driven:
//!
//! - pending subscriptions whose checkout was abandoned (no notification
//!   within 24 hours) are cancelled;
//! - active subscriptions past their paid period are expired.
//!
//! Both run from the scheduler, row by row; one failing row is logged and
//! skipped so a single bad record cannot stall the sweep.

use std::sync::Arc;

use crate::domain::billing::{SideEffect, Subscription};
use crate::domain::foundation::{DomainError, Timestamp};
use crate::ports::{SideEffectDispatcher, SubscriptionStore};

/// How long a checkout may stay pending before the sweep cancels it.
const STALE_PENDING_HOURS: i64 = 24;

/// Outcome of one sweep run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SweepReport {
    /// Rows transitioned successfully.
    pub swept: usize,
    /// Rows that failed and were skipped.
    pub failed: usize,
}

/// Cancels pending subscriptions older than 24 hours.
///
/// Known gap: a checkout settled at the gateway in the same instant the
/// sweep runs races this cancellation. Confirming against the gateway's
/// status-query API before cancelling would close it; until then the sweep
/// logs each cancellation loudly enough to reconcile by hand.
pub struct SweepStalePendingHandler {
    store: Arc<dyn SubscriptionStore>,
    dispatcher: Arc<dyn SideEffectDispatcher>,
}

impl SweepStalePendingHandler {
    pub fn new(
        store: Arc<dyn SubscriptionStore>,
        dispatcher: Arc<dyn SideEffectDispatcher>,
    ) -> Self {
        Self { store, dispatcher }
    }

    pub async fn handle(&self) -> Result<SweepReport, DomainError> {
        let cutoff = Timestamp::now().minus_hours(STALE_PENDING_HOURS);
        let stale = self.store.find_stale_pending(cutoff).await?;

        let mut report = SweepReport::default();
        for mut subscription in stale {
            match self.cancel_one(&mut subscription).await {
                Ok(()) => report.swept += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::error!(
                        order_id = %subscription.order_id,
                        error = %e,
                        "stale-pending sweep failed for row"
                    );
                }
            }
        }

        if report.swept > 0 || report.failed > 0 {
            tracing::info!(
                swept = report.swept,
                failed = report.failed,
                "stale-pending sweep finished"
            );
        }
        Ok(report)
    }

    async fn cancel_one(&self, subscription: &mut Subscription) -> Result<(), DomainError> {
        tracing::warn!(
            order_id = %subscription.order_id,
            created_at = ?subscription.created_at,
            "cancelling abandoned checkout; verify no in-flight settlement"
        );

        subscription.cancel("checkout abandoned")?;
        self.store.update(subscription).await?;

        let effect = SideEffect::SubscriptionCancelled {
            user_id: subscription.user_id.clone(),
            order_id: subscription.order_id.clone(),
            reason: "checkout abandoned".to_string(),
        };
        if let Err(e) = self.dispatcher.dispatch(effect).await {
            tracing::error!(
                order_id = %subscription.order_id,
                error = %e,
                "cancellation notice dispatch failed; job queue will retry"
            );
        }
        Ok(())
    }
}

/// Expires active subscriptions whose paid period has ended.
pub struct ExpireSubscriptionsHandler {
    store: Arc<dyn SubscriptionStore>,
    dispatcher: Arc<dyn SideEffectDispatcher>,
}

impl ExpireSubscriptionsHandler {
    pub fn new(
        store: Arc<dyn SubscriptionStore>,
        dispatcher: Arc<dyn SideEffectDispatcher>,
    ) -> Self {
        Self { store, dispatcher }
    }

    pub async fn handle(&self) -> Result<SweepReport, DomainError> {
        let now = Timestamp::now();
        let lapsed = self.store.find_active_past_end(now).await?;

        let mut report = SweepReport::default();
        for mut subscription in lapsed {
            match self.expire_one(&mut subscription).await {
                Ok(()) => report.swept += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::error!(
                        order_id = %subscription.order_id,
                        error = %e,
                        "expiry sweep failed for row"
                    );
                }
            }
        }

        if report.swept > 0 || report.failed > 0 {
            tracing::info!(
                swept = report.swept,
                failed = report.failed,
                "expiry sweep finished"
            );
        }
        Ok(report)
    }

    async fn expire_one(&self, subscription: &mut Subscription) -> Result<(), DomainError> {
        subscription.expire()?;
        self.store.update(subscription).await?;

        let effect = SideEffect::SubscriptionExpired {
            user_id: subscription.user_id.clone(),
            order_id: subscription.order_id.clone(),
        };
        if let Err(e) = self.dispatcher.dispatch(effect).await {
            tracing::error!(
                order_id = %subscription.order_id,
                error = %e,
                "expiry notice dispatch failed; job queue will retry"
            );
        }
        Ok(())
    }
}
