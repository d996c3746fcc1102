//! Subscription status state machine.
//!
//! Defines all possible subscription states and valid transitions
//! according to the payment lifecycle.

use crate::domain::foundation::StateMachine;
use serde::{Deserialize, Serialize};

/// Subscription lifecycle status.
///
/// Driven exclusively by validated, de-duplicated gateway events and the
/// scheduled lifecycle sweeps. Other subsystems read it to gate access but
/// never write it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Checkout initiated, awaiting gateway settlement.
    /// No access until payment completes.
    Pending,

    /// Payment settled. Full access until the period ends.
    Active,

    /// Payment was denied or the gateway expired the order before payment.
    Failed,

    /// Cancelled by the gateway, the user, or the stale-checkout sweep.
    Cancelled,

    /// Billing period ended. User must start a new checkout.
    Expired,
}

impl SubscriptionStatus {
    /// Returns true if this status grants access to paid features.
    pub fn has_access(&self) -> bool {
        matches!(self, SubscriptionStatus::Active)
    }

    /// Stable string form used in the database and API payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Pending => "pending",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Failed => "failed",
            SubscriptionStatus::Cancelled => "cancelled",
            SubscriptionStatus::Expired => "expired",
        }
    }
}

impl StateMachine for SubscriptionStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use SubscriptionStatus::*;
        matches!(
            (self, target),
            // From PENDING: settlement, failure, gateway cancel, stale sweep
            (Pending, Active)
                | (Pending, Failed)
                | (Pending, Cancelled)
                | (Pending, Expired)
            // From ACTIVE: period end or cancellation
                | (Active, Expired)
                | (Active, Cancelled)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use SubscriptionStatus::*;
        match self {
            Pending => vec![Active, Failed, Cancelled, Expired],
            Active => vec![Expired, Cancelled],
            Failed => vec![],
            Cancelled => vec![],
            Expired => vec![],
        }
    }
}
