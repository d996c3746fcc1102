//! HTTP adapter for the gateway webhook endpoints.

mod dto;
mod handlers;
mod routes;

pub use handlers::{
    handle_midtrans_webhook, handle_test_webhook, WebhookApiError, WebhookAppState,
};
pub use routes::{test_webhook_routes, webhook_routes};
