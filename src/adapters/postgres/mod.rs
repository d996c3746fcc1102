//! PostgreSQL adapters.
//!
//! Implements the persistence ports with sqlx. The ledger's event-id
//! PRIMARY KEY and the subscriptions table's order-id unique index back
//! the reconciliation engine's idempotency invariants.

mod notification_ledger;
mod subscription_store;

pub use notification_ledger::PostgresNotificationLedger;
pub use subscription_store::PostgresSubscriptionStore;
