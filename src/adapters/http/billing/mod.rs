//! HTTP adapter for the billing endpoints.

mod dto;
mod handlers;
mod routes;

pub use handlers::{create_checkout, BillingApiError, BillingAppState};
pub use routes::billing_routes;
