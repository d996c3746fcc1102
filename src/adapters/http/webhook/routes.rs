//! Axum router configuration for the webhook endpoints.
//!
//! Webhooks carry their own authentication (the signature), so these
//! routers take no auth middleware.

use axum::{routing::post, Router};

use super::handlers::{handle_midtrans_webhook, handle_test_webhook, WebhookAppState};

/// Create the production webhook router.
///
/// # Routes
/// - `POST /midtrans` - gateway notifications (signature-verified,
///   optionally IP-gated)
///
/// Mount at `/webhooks`.
pub fn webhook_routes() -> Router<WebhookAppState> {
    Router::new().route("/midtrans", post(handle_midtrans_webhook))
}

/// Create the simulation webhook router.
///
/// Same pipeline as production but never IP-gated. Mount at
/// `/test/webhook` in non-production environments only.
pub fn test_webhook_routes() -> Router<WebhookAppState> {
    Router::new().route("/midtrans", post(handle_test_webhook))
}
