//! Application layer - Commands and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.

pub mod handlers;

pub use handlers::{
    CreateCheckoutCommand, CreateCheckoutHandler, CreateCheckoutResult,
    ExpireSubscriptionsHandler, ProcessWebhookCommand, ProcessWebhookHandler, SweepReport,
    SweepStalePendingHandler,
};
