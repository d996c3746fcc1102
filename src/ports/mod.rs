//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Reconciliation Ports
//!
//! - `NotificationLedger` - durable, append-only record of inbound gateway
//!   events, keyed by the provider's event id (idempotency)
//! - `SubscriptionStore` - subscription persistence plus the transactional
//!   commit spanning subscription update + ledger mark
//!
//! ## Side-Effect Ports
//!
//! - `SideEffectDispatcher` - fire-and-forget notification jobs
//! - `AlertSink` - operator-visible alerts on permanent failure

mod alerts;
mod dispatcher;
mod notification_ledger;
mod subscription_store;

pub use alerts::{AlertSink, OperatorAlert};
pub use dispatcher::SideEffectDispatcher;
pub use notification_ledger::{NotificationLedger, NotificationRecord, RecordOutcome};
pub use subscription_store::SubscriptionStore;
