//! Adapters - Implementations of ports for external systems.
//!
//! # Modules
//!
//! - `http` - axum routers for webhooks and billing
//! - `postgres` - sqlx persistence for subscriptions and the ledger
//! - `memory` - in-memory ports for tests and sandbox wiring
//! - `dispatch` - retry shell for deferred webhook processing
//! - `scheduler` - periodic lifecycle sweeps
//! - `notify` - notification job queue and alert sink

pub mod dispatch;
pub mod http;
pub mod memory;
pub mod notify;
pub mod postgres;
pub mod scheduler;
