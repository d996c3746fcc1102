//! Kasira - Small-Business Subscription Billing
//!
//! This crate implements subscription billing for the Kasira platform:
//! checkout initiation, Midtrans payment-webhook reconciliation, and
//! scheduled subscription lifecycle sweeps.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
