//! SubscriptionStore port - persistence for Subscription aggregates.
//!
//! Besides plain CRUD, this port owns the reconciliation engine's
//! transactional boundary: `commit_transition` persists a subscription
//! update AND the ledger's processed mark in one datastore transaction,
//! so the financial transition and its idempotency record succeed or roll
//! back together (never one without the other).

use async_trait::async_trait;

use crate::domain::billing::Subscription;
use crate::domain::foundation::{DomainError, Timestamp};

/// Port for storing and querying subscriptions.
///
/// Implementations enforce the order-id uniqueness invariant at the
/// datastore level and scope locking to single rows; no global lock is
/// taken across subscriptions.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Persist a new subscription.
    ///
    /// Fails with `ErrorCode::DuplicateOrder` if the order id exists.
    async fn insert(&self, subscription: &Subscription) -> Result<(), DomainError>;

    /// Find a subscription by its merchant order id.
    async fn find_by_order_id(&self, order_id: &str) -> Result<Option<Subscription>, DomainError>;

    /// Persist an updated subscription outside the reconciliation path
    /// (used by the lifecycle sweeps).
    async fn update(&self, subscription: &Subscription) -> Result<(), DomainError>;

    /// Atomically persist a reconciled subscription and mark the ledger
    /// record for `event_id` as processed. Both writes commit together or
    /// not at all.
    async fn commit_transition(
        &self,
        subscription: &Subscription,
        event_id: &str,
    ) -> Result<(), DomainError>;

    /// Pending subscriptions created before the cutoff (stale checkouts).
    async fn find_stale_pending(
        &self,
        cutoff: Timestamp,
    ) -> Result<Vec<Subscription>, DomainError>;

    /// Active subscriptions whose paid period ended before `now`.
    async fn find_active_past_end(&self, now: Timestamp)
        -> Result<Vec<Subscription>, DomainError>;
}
