//! Application handlers.
//!
//! Command handlers that orchestrate domain operations.
//!
//! ## Commands
//! - Processing gateway webhooks (the reconciliation entry point)
//! - Initiating checkouts (pending subscription + order id)
//! - Scheduled lifecycle sweeps (stale checkouts, period expiry)

mod create_checkout;
mod process_webhook;
mod sweep_subscriptions;

pub use create_checkout::{CreateCheckoutCommand, CreateCheckoutHandler, CreateCheckoutResult};
pub use process_webhook::{ProcessWebhookCommand, ProcessWebhookHandler};
pub use sweep_subscriptions::{
    ExpireSubscriptionsHandler, SweepReport, SweepStalePendingHandler,
};
