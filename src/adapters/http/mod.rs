//! HTTP adapters.
//!
//! Axum routers and handlers for the service's HTTP surface.

pub mod billing;
pub mod webhook;
