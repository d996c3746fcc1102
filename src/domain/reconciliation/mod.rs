//! Reconciliation domain module.
//!
//! The payment-webhook reconciliation engine: authenticates asynchronous,
//! possibly-duplicated, possibly-out-of-order gateway notifications and
//! drives the subscription lifecycle exactly once per real-world event.
//!
//! # Module Structure
//!
//! - `notification` - parsed gateway payloads and required-field extraction
//! - `signature` - SHA-512 signature verification (fail closed)
//! - `transition` - pure (status, event) -> decision function
//! - `processor` - the orchestrator tying verification, ledger, and
//!   state machine together
//! - `errors` - webhook error taxonomy with HTTP mapping

mod errors;
mod notification;
mod processor;
mod signature;
mod transition;

pub use errors::WebhookError;
pub use notification::{GatewayNotification, TransactionStatus, REQUIRED_FIELDS};
pub use processor::{ReconcileOutcome, ReconciliationProcessor};
pub use signature::SignatureVerifier;
pub use transition::{decide, PaymentAction, TransitionDecision};

#[cfg(test)]
pub use notification::fixtures;
#[cfg(test)]
pub use signature::compute_test_signature;
