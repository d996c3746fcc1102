//! Side-effect commands emitted after reconciliation commits.
//!
//! The reconciliation engine never sends email or in-app notifications
//! inline. Instead it returns a list of these commands, and the caller
//! dispatches them after the persistence transaction has committed. A
//! failed dispatch is retried independently and can never roll back or
//! re-run the financial transition.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{OrderId, Timestamp, UserId};

/// A deferred notification job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SideEffect {
    /// Payment settled; receipt email.
    PaymentReceived {
        user_id: UserId,
        order_id: OrderId,
        gross_amount: String,
        payment_type: String,
    },

    /// Subscription switched to Active; welcome/feature-unlock email.
    SubscriptionActivated {
        user_id: UserId,
        order_id: OrderId,
        ends_at: Timestamp,
    },

    /// Payment failed or the gateway expired the order.
    PaymentFailed {
        user_id: UserId,
        order_id: OrderId,
        reason: String,
    },

    /// Subscription cancelled (gateway, user, or stale-checkout sweep).
    SubscriptionCancelled {
        user_id: UserId,
        order_id: OrderId,
        reason: String,
    },

    /// Paid period ended.
    SubscriptionExpired {
        user_id: UserId,
        order_id: OrderId,
    },
}

impl SideEffect {
    /// Stable name used in logs and queue routing.
    pub fn kind(&self) -> &'static str {
        match self {
            SideEffect::PaymentReceived { .. } => "payment_received",
            SideEffect::SubscriptionActivated { .. } => "subscription_activated",
            SideEffect::PaymentFailed { .. } => "payment_failed",
            SideEffect::SubscriptionCancelled { .. } => "subscription_cancelled",
            SideEffect::SubscriptionExpired { .. } => "subscription_expired",
        }
    }

    /// The order this effect concerns, for log correlation.
    pub fn order_id(&self) -> &OrderId {
        match self {
            SideEffect::PaymentReceived { order_id, .. }
            | SideEffect::SubscriptionActivated { order_id, .. }
            | SideEffect::PaymentFailed { order_id, .. }
            | SideEffect::SubscriptionCancelled { order_id, .. }
            | SideEffect::SubscriptionExpired { order_id, .. } => order_id,
        }
    }
}
