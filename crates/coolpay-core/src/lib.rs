//! # Coolpay Core
//!
//! Core domain types for the Coolpay payment API client.
//!
//! This crate contains pure domain logic with no I/O dependencies:
//! - Domain models (recipients, payments)
//! - Raw wire response structures
//! - Request validation
//! - Error definitions

pub mod errors;
pub mod models;

// Re-export commonly used types
pub use errors::{CoolpayError, Result};
pub use models::{
    ApiLoginResponse, ApiPaymentResponse, ApiPaymentsResponse, ApiRecipientResponse,
    ApiRecipientsResponse, Payment, PaymentRequest, Recipient, DEFAULT_CURRENCY,
};
