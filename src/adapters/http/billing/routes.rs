//! Axum router configuration for the billing endpoints.

use axum::{routing::post, Router};

use super::handlers::{create_checkout, BillingAppState};

/// Create the billing API router.
///
/// # Routes
/// - `POST /checkout` - initiate a paid checkout
///
/// Mount at `/billing`. Authentication is the platform gateway's concern;
/// this service trusts the forwarded user id.
pub fn billing_routes() -> Router<BillingAppState> {
    Router::new().route("/checkout", post(create_checkout))
}
