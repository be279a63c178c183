//! # Coolpay API
//!
//! HTTP client for the Coolpay payment-processing API.
//! This crate authenticates a user, caches the bearer token, and exposes
//! operations to search/create recipients and list/create payments.

pub mod client;
pub mod errors;
pub mod sdk;

// Re-export common types for convenience
pub use client::*;
pub use errors::*;
pub use sdk::*;

// Re-export core types that API consumers will need
pub use coolpay_core::{Payment, PaymentRequest, Recipient, Result as CoreResult};
