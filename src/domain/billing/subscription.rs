//! Subscription aggregate entity.
//!
//! The Subscription aggregate represents one checkout attempt and the paid
//! period it buys. It is the only entity the reconciliation engine mutates.
//!
//! # Design Decisions
//!
//! - **One subscription per (user, order id)**: unique constraint on
//!   order_id enforced at database level
//! - **Money in whole currency units**: IDR has no minor unit; prices are i64
//! - **Set-once transaction id**: recorded on first settlement, never
//!   overwritten by later duplicate notifications
//! - **State machine transitions**: every status change goes through
//!   `SubscriptionStatus::transition_to`

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    DomainError, ErrorCode, OrderId, PackageId, StateMachine, SubscriptionId, Timestamp, UserId,
};

use super::{BillingInterval, SubscriptionStatus};

/// Subscription aggregate - one checkout attempt and its lifecycle.
///
/// # Invariants
///
/// - `id` is globally unique; `order_id` is unique across all subscriptions
/// - `transaction_id` is set exactly once, on first settlement
/// - Status transitions follow the state machine rules
/// - When Active: `starts_at <= ends_at`, both set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    /// Unique identifier for this subscription.
    pub id: SubscriptionId,

    /// User who owns this subscription.
    pub user_id: UserId,

    /// Package being paid for.
    pub package_id: PackageId,

    /// Billing interval locked in at checkout. Determines the paid period
    /// opened on activation, independent of later catalog changes.
    pub interval: BillingInterval,

    /// Merchant order id correlating gateway notifications to this row.
    pub order_id: OrderId,

    /// Gateway transaction id, recorded on first settlement.
    pub transaction_id: Option<String>,

    /// Payment channel reported by the gateway (e.g. "gopay", "bank_transfer").
    pub payment_type: Option<String>,

    /// Current status in the payment lifecycle.
    pub status: SubscriptionStatus,

    /// Start of the paid period. Set on activation.
    pub starts_at: Option<Timestamp>,

    /// End of the paid period. Set on activation.
    pub ends_at: Option<Timestamp>,

    /// When the subscription was cancelled (if cancelled).
    pub cancelled_at: Option<Timestamp>,

    /// Why the subscription failed or was cancelled (if it was).
    pub failure_reason: Option<String>,

    /// When the subscription was created.
    pub created_at: Timestamp,

    /// When the subscription was last updated.
    pub updated_at: Timestamp,
}

impl Subscription {
    /// Create a new pending subscription for a checkout attempt.
    ///
    /// The order id is assigned here and sent to the gateway; every later
    /// notification for this checkout carries it back.
    pub fn create_pending(
        id: SubscriptionId,
        user_id: UserId,
        package_id: PackageId,
        interval: BillingInterval,
        order_id: OrderId,
    ) -> Self {
        let now = Timestamp::now();
        Self {
            id,
            user_id,
            package_id,
            interval,
            order_id,
            transaction_id: None,
            payment_type: None,
            status: SubscriptionStatus::Pending,
            starts_at: None,
            ends_at: None,
            cancelled_at: None,
            failure_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check if this subscription currently grants access.
    ///
    /// Returns true only for Active subscriptions still within their period.
    pub fn has_access(&self) -> bool {
        if !self.status.has_access() {
            return false;
        }
        match self.ends_at {
            Some(ends_at) => Timestamp::now() <= ends_at,
            None => false,
        }
    }

    /// Activate this subscription after settlement.
    ///
    /// Records the gateway transaction id and payment type, and opens the
    /// paid period: `starts_at = now`, `ends_at = now + interval`.
    ///
    /// # Errors
    ///
    /// Returns an error if the transition from the current status is not
    /// allowed, or if a transaction id was already recorded (a duplicate
    /// settlement must never overwrite the original).
    pub fn activate(
        &mut self,
        transaction_id: String,
        payment_type: String,
        now: Timestamp,
    ) -> Result<(), DomainError> {
        if self.transaction_id.is_some() {
            return Err(DomainError::new(
                ErrorCode::TransactionAlreadyRecorded,
                format!(
                    "Subscription {} already settled by transaction {}",
                    self.order_id,
                    self.transaction_id.as_deref().unwrap_or_default()
                ),
            ));
        }

        self.transition(SubscriptionStatus::Active)?;
        self.transaction_id = Some(transaction_id);
        self.payment_type = Some(payment_type);
        self.starts_at = Some(now);
        self.ends_at = Some(now.add_days(self.interval.period_days()));
        self.updated_at = Timestamp::now();
        Ok(())
    }

    /// Mark this subscription as failed (denied or expired before payment).
    ///
    /// # Errors
    ///
    /// Returns error if transition from current status is not allowed.
    pub fn fail(&mut self, reason: impl Into<String>) -> Result<(), DomainError> {
        self.transition(SubscriptionStatus::Failed)?;
        self.failure_reason = Some(reason.into());
        self.updated_at = Timestamp::now();
        Ok(())
    }

    /// Cancel this subscription.
    ///
    /// # Errors
    ///
    /// Returns error if transition from current status is not allowed.
    pub fn cancel(&mut self, reason: impl Into<String>) -> Result<(), DomainError> {
        self.transition(SubscriptionStatus::Cancelled)?;
        self.cancelled_at = Some(Timestamp::now());
        self.failure_reason = Some(reason.into());
        self.updated_at = Timestamp::now();
        Ok(())
    }

    /// Mark this subscription as expired.
    ///
    /// # Errors
    ///
    /// Returns error if transition from current status is not allowed.
    pub fn expire(&mut self) -> Result<(), DomainError> {
        self.transition(SubscriptionStatus::Expired)?;
        self.updated_at = Timestamp::now();
        Ok(())
    }

    /// True for pending subscriptions whose checkout was started before
    /// the cutoff. Used by the stale-checkout sweep.
    pub fn is_stale_pending(&self, cutoff: Timestamp) -> bool {
        self.status == SubscriptionStatus::Pending && self.created_at.is_before(&cutoff)
    }

    /// True for active subscriptions whose paid period has ended.
    pub fn is_past_period_end(&self, now: Timestamp) -> bool {
        self.status == SubscriptionStatus::Active
            && self.ends_at.map(|e| e.is_before(&now)).unwrap_or(false)
    }

    /// Transition to a new status using the state machine.
    fn transition(&mut self, target: SubscriptionStatus) -> Result<(), DomainError> {
        self.status = self.status.transition_to(target).map_err(|_| {
            DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!(
                    "Cannot transition subscription {} from {:?} to {:?}",
                    self.order_id, self.status, target
                ),
            )
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_subscription() -> Subscription {
        Subscription::create_pending(
            SubscriptionId::new(),
            UserId::new("1").unwrap(),
            PackageId::new(2),
            BillingInterval::Monthly,
            OrderId::new("SUB-1-2-123").unwrap(),
        )
    }

    fn activated_subscription() -> Subscription {
        let mut sub = test_subscription();
        sub.activate("tx-9001".to_string(), "gopay".to_string(), Timestamp::now())
            .unwrap();
        sub
    }

    // Construction tests

    #[test]
    fn create_pending_starts_pending_without_period() {
        let sub = test_subscription();

        assert_eq!(sub.status, SubscriptionStatus::Pending);
        assert!(sub.transaction_id.is_none());
        assert!(sub.starts_at.is_none());
        assert!(sub.ends_at.is_none());
        assert!(sub.cancelled_at.is_none());
    }

    // Activation tests

    #[test]
    fn activate_sets_transaction_period_and_status() {
        let sub = activated_subscription();

        assert_eq!(sub.status, SubscriptionStatus::Active);
        assert_eq!(sub.transaction_id, Some("tx-9001".to_string()));
        assert_eq!(sub.payment_type, Some("gopay".to_string()));

        let starts = sub.starts_at.unwrap();
        let ends = sub.ends_at.unwrap();
        assert_eq!(ends.duration_since(&starts).num_days(), 30);
    }

    #[test]
    fn activate_twice_is_rejected_and_preserves_original_transaction() {
        let mut sub = activated_subscription();
        let original_ends = sub.ends_at;

        let result = sub.activate(
            "tx-9002".to_string(),
            "bank_transfer".to_string(),
            Timestamp::now(),
        );

        assert!(result.is_err());
        assert_eq!(sub.transaction_id, Some("tx-9001".to_string()));
        assert_eq!(sub.payment_type, Some("gopay".to_string()));
        assert_eq!(sub.ends_at, original_ends);
    }

    #[test]
    fn yearly_interval_opens_a_year_long_period() {
        let mut sub = test_subscription();
        sub.interval = BillingInterval::Yearly;
        sub.activate("tx-1".to_string(), "qris".to_string(), Timestamp::now())
            .unwrap();

        let starts = sub.starts_at.unwrap();
        let ends = sub.ends_at.unwrap();
        assert_eq!(ends.duration_since(&starts).num_days(), 365);
    }

    // Access tests

    #[test]
    fn active_subscription_has_access() {
        assert!(activated_subscription().has_access());
    }

    #[test]
    fn pending_subscription_no_access() {
        assert!(!test_subscription().has_access());
    }

    #[test]
    fn active_past_period_end_no_access() {
        let mut sub = activated_subscription();
        sub.ends_at = Some(Timestamp::now().minus_days(1));
        assert!(!sub.has_access());
    }

    // Lifecycle transition tests

    #[test]
    fn pending_can_fail_with_reason() {
        let mut sub = test_subscription();

        sub.fail("expired before payment").unwrap();
        assert_eq!(sub.status, SubscriptionStatus::Failed);
        assert_eq!(
            sub.failure_reason,
            Some("expired before payment".to_string())
        );
    }

    #[test]
    fn pending_can_cancel() {
        let mut sub = test_subscription();

        sub.cancel("checkout abandoned").unwrap();
        assert_eq!(sub.status, SubscriptionStatus::Cancelled);
        assert!(sub.cancelled_at.is_some());
    }

    #[test]
    fn active_can_expire() {
        let mut sub = activated_subscription();

        sub.expire().unwrap();
        assert_eq!(sub.status, SubscriptionStatus::Expired);
    }

    #[test]
    fn failed_cannot_activate() {
        let mut sub = test_subscription();
        sub.fail("denied by bank").unwrap();

        let result = sub.activate("tx-1".to_string(), "gopay".to_string(), Timestamp::now());
        assert!(result.is_err());
        assert_eq!(sub.status, SubscriptionStatus::Failed);
    }

    #[test]
    fn cancelled_cannot_expire() {
        let mut sub = test_subscription();
        sub.cancel("user request").unwrap();
        assert!(sub.expire().is_err());
    }

    // Sweep predicate tests

    #[test]
    fn stale_pending_detected_against_cutoff() {
        let mut sub = test_subscription();
        // Pretend the checkout started two days ago
        sub.created_at = Timestamp::now().minus_days(2);

        let cutoff = Timestamp::now().minus_hours(24);
        assert!(sub.is_stale_pending(cutoff));
    }

    #[test]
    fn fresh_pending_is_not_stale() {
        let sub = test_subscription();
        let cutoff = Timestamp::now().minus_hours(24);
        assert!(!sub.is_stale_pending(cutoff));
    }

    #[test]
    fn active_subscription_is_never_stale_pending() {
        let mut sub = activated_subscription();
        sub.created_at = Timestamp::now().minus_days(10);
        let cutoff = Timestamp::now().minus_hours(24);
        assert!(!sub.is_stale_pending(cutoff));
    }

    #[test]
    fn past_period_end_detected_for_active_only() {
        let mut sub = activated_subscription();
        sub.ends_at = Some(Timestamp::now().minus_days(1));
        assert!(sub.is_past_period_end(Timestamp::now()));

        sub.expire().unwrap();
        assert!(!sub.is_past_period_end(Timestamp::now()));
    }
}
