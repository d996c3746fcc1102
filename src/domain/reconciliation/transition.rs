//! Pure transition decisions for gateway events.
//!
//! Maps (current subscription status, reported transaction status) to a
//! decision: apply an action, ignore the event, or flag an anomaly. The
//! function is pure and total - arrival order carries no meaning, so a
//! stale `pending` arriving after `settlement` simply decides `Ignore`.

use crate::domain::billing::SubscriptionStatus;

use super::notification::TransactionStatus;

/// An action the orchestrator should apply to the subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentAction {
    /// Settle the payment: record transaction id and open the paid period.
    Activate,
    /// Mark the checkout failed with the given reason.
    Fail { reason: &'static str },
    /// Cancel the subscription with the given reason.
    Cancel { reason: &'static str },
}

impl PaymentAction {
    /// The status this action drives the subscription to.
    pub fn target_status(&self) -> SubscriptionStatus {
        match self {
            PaymentAction::Activate => SubscriptionStatus::Active,
            PaymentAction::Fail { .. } => SubscriptionStatus::Failed,
            PaymentAction::Cancel { .. } => SubscriptionStatus::Cancelled,
        }
    }
}

/// Outcome of the pure decision step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionDecision {
    /// The event applies; the orchestrator commits the action.
    Apply(PaymentAction),

    /// The event carries no new information (duplicate terminal event,
    /// stale `pending`, unhandled status). Acknowledged, nothing changes.
    Ignore { reason: &'static str },

    /// The event contradicts the subscription's state (e.g. a settlement
    /// for a cancelled order). Logged for operators, acknowledged to the
    /// gateway, never applied.
    Anomaly { reason: &'static str },
}

/// Decide what a gateway event means for a subscription in `current` state.
///
/// Idempotency rule: re-delivering the event that produced the current
/// state decides `Ignore`, never an error. Defensive rule: an event whose
/// target is unreachable from the current state decides `Anomaly`.
pub fn decide(current: SubscriptionStatus, event: TransactionStatus) -> TransitionDecision {
    use SubscriptionStatus as S;
    use TransactionStatus as T;

    match (event, current) {
        // Successful payment
        (T::Settlement | T::Capture, S::Pending) => TransitionDecision::Apply(PaymentAction::Activate),
        (T::Settlement | T::Capture, S::Active) => TransitionDecision::Ignore {
            reason: "duplicate settlement for an active subscription",
        },
        (T::Settlement | T::Capture, S::Failed | S::Cancelled | S::Expired) => {
            TransitionDecision::Anomaly {
                reason: "settlement reported for a closed subscription",
            }
        }

        // Gateway-side pending is informational; it never moves state and
        // must never downgrade a settled subscription
        (T::Pending, S::Pending) => TransitionDecision::Ignore {
            reason: "subscription already awaiting payment",
        },
        (T::Pending, _) => TransitionDecision::Ignore {
            reason: "stale pending event after a terminal transition",
        },

        // Order expired before the customer paid
        (T::Expire, S::Pending) => TransitionDecision::Apply(PaymentAction::Fail {
            reason: "expired before payment",
        }),
        (T::Expire, S::Failed) => TransitionDecision::Ignore {
            reason: "expiry already recorded",
        },
        (T::Expire, S::Active | S::Cancelled | S::Expired) => TransitionDecision::Anomaly {
            reason: "order expiry reported for a settled or closed subscription",
        },

        // Payment denied
        (T::Deny, S::Pending) => TransitionDecision::Apply(PaymentAction::Fail {
            reason: "denied by gateway",
        }),
        (T::Deny, S::Failed) => TransitionDecision::Ignore {
            reason: "denial already recorded",
        },
        (T::Deny, S::Active | S::Cancelled | S::Expired) => TransitionDecision::Anomaly {
            reason: "denial reported for a settled or closed subscription",
        },

        // Gateway-initiated cancellation
        (T::Cancel, S::Pending | S::Active) => TransitionDecision::Apply(PaymentAction::Cancel {
            reason: "cancelled by gateway",
        }),
        (T::Cancel, S::Cancelled) => TransitionDecision::Ignore {
            reason: "cancellation already recorded",
        },
        (T::Cancel, S::Failed | S::Expired) => TransitionDecision::Anomaly {
            reason: "cancellation reported for a closed subscription",
        },

        // Statuses this service does not act on
        (T::Unknown, _) => TransitionDecision::Ignore {
            reason: "unhandled transaction status",
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::StateMachine;
    use proptest::prelude::*;

    const ALL_STATUSES: [SubscriptionStatus; 5] = [
        SubscriptionStatus::Pending,
        SubscriptionStatus::Active,
        SubscriptionStatus::Failed,
        SubscriptionStatus::Cancelled,
        SubscriptionStatus::Expired,
    ];

    const ALL_EVENTS: [TransactionStatus; 7] = [
        TransactionStatus::Capture,
        TransactionStatus::Settlement,
        TransactionStatus::Pending,
        TransactionStatus::Deny,
        TransactionStatus::Cancel,
        TransactionStatus::Expire,
        TransactionStatus::Unknown,
    ];

    // ══════════════════════════════════════════════════════════════
    // Mapping Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn settlement_on_pending_activates() {
        let decision = decide(SubscriptionStatus::Pending, TransactionStatus::Settlement);
        assert_eq!(decision, TransitionDecision::Apply(PaymentAction::Activate));
    }

    #[test]
    fn capture_is_treated_like_settlement() {
        assert_eq!(
            decide(SubscriptionStatus::Pending, TransactionStatus::Capture),
            decide(SubscriptionStatus::Pending, TransactionStatus::Settlement)
        );
    }

    #[test]
    fn duplicate_settlement_on_active_is_ignored() {
        let decision = decide(SubscriptionStatus::Active, TransactionStatus::Settlement);
        assert!(matches!(decision, TransitionDecision::Ignore { .. }));
    }

    #[test]
    fn settlement_on_cancelled_is_an_anomaly() {
        let decision = decide(SubscriptionStatus::Cancelled, TransactionStatus::Settlement);
        assert!(matches!(decision, TransitionDecision::Anomaly { .. }));
    }

    #[test]
    fn pending_event_on_pending_is_a_noop() {
        let decision = decide(SubscriptionStatus::Pending, TransactionStatus::Pending);
        assert!(matches!(decision, TransitionDecision::Ignore { .. }));
    }

    #[test]
    fn stale_pending_never_downgrades_active() {
        let decision = decide(SubscriptionStatus::Active, TransactionStatus::Pending);
        assert!(matches!(decision, TransitionDecision::Ignore { .. }));
    }

    #[test]
    fn expire_on_pending_fails_with_reason() {
        let decision = decide(SubscriptionStatus::Pending, TransactionStatus::Expire);
        assert_eq!(
            decision,
            TransitionDecision::Apply(PaymentAction::Fail {
                reason: "expired before payment"
            })
        );
    }

    #[test]
    fn deny_on_pending_fails() {
        let decision = decide(SubscriptionStatus::Pending, TransactionStatus::Deny);
        assert!(matches!(
            decision,
            TransitionDecision::Apply(PaymentAction::Fail { .. })
        ));
    }

    #[test]
    fn cancel_applies_from_pending_and_active() {
        for current in [SubscriptionStatus::Pending, SubscriptionStatus::Active] {
            let decision = decide(current, TransactionStatus::Cancel);
            assert!(matches!(
                decision,
                TransitionDecision::Apply(PaymentAction::Cancel { .. })
            ));
        }
    }

    #[test]
    fn redelivered_terminal_events_are_idempotent() {
        // The event that produced the current state is ignored, not an error
        assert!(matches!(
            decide(SubscriptionStatus::Failed, TransactionStatus::Expire),
            TransitionDecision::Ignore { .. }
        ));
        assert!(matches!(
            decide(SubscriptionStatus::Failed, TransactionStatus::Deny),
            TransitionDecision::Ignore { .. }
        ));
        assert!(matches!(
            decide(SubscriptionStatus::Cancelled, TransactionStatus::Cancel),
            TransitionDecision::Ignore { .. }
        ));
    }

    #[test]
    fn unknown_status_is_ignored_everywhere() {
        for current in ALL_STATUSES {
            assert!(matches!(
                decide(current, TransactionStatus::Unknown),
                TransitionDecision::Ignore { .. }
            ));
        }
    }

    #[test]
    fn terminal_gateway_statuses_never_map_to_active() {
        for event in [
            TransactionStatus::Expire,
            TransactionStatus::Deny,
            TransactionStatus::Cancel,
        ] {
            for current in ALL_STATUSES {
                if let TransitionDecision::Apply(action) = decide(current, event) {
                    assert_ne!(
                        action.target_status(),
                        SubscriptionStatus::Active,
                        "{:?} on {:?} must not activate",
                        event,
                        current
                    );
                }
            }
        }
    }

    // ══════════════════════════════════════════════════════════════
    // Property Tests
    // ══════════════════════════════════════════════════════════════

    proptest! {
        /// Every applied action must be a legal state-machine transition.
        #[test]
        fn applied_actions_are_always_legal_transitions(
            current_idx in 0usize..5,
            event_idx in 0usize..7,
        ) {
            let current = ALL_STATUSES[current_idx];
            let event = ALL_EVENTS[event_idx];

            if let TransitionDecision::Apply(action) = decide(current, event) {
                prop_assert!(
                    current.can_transition_to(&action.target_status()),
                    "decide produced illegal transition {:?} -> {:?} for event {:?}",
                    current,
                    action.target_status(),
                    event
                );
            }
        }

        /// The decision function is total and deterministic.
        #[test]
        fn decide_is_deterministic(
            current_idx in 0usize..5,
            event_idx in 0usize..7,
        ) {
            let current = ALL_STATUSES[current_idx];
            let event = ALL_EVENTS[event_idx];
            prop_assert_eq!(decide(current, event), decide(current, event));
        }

        /// Success events only ever activate from Pending.
        #[test]
        fn activation_only_from_pending(current_idx in 0usize..5) {
            let current = ALL_STATUSES[current_idx];
            for event in [TransactionStatus::Settlement, TransactionStatus::Capture] {
                let activates = matches!(
                    decide(current, event),
                    TransitionDecision::Apply(PaymentAction::Activate)
                );
                prop_assert_eq!(activates, current == SubscriptionStatus::Pending);
            }
        }
    }
}
