use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::errors::{CoolpayError, Result};

/// Currency used when a payment request does not specify one.
pub const DEFAULT_CURRENCY: &str = "GBP";

/// A payee registered with Coolpay. Payments can only reference
/// recipients that exist, so one is created before the first payment.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Recipient {
    pub id: String, // Server-assigned UUID
    pub name: String,
}

/// A transfer record as returned by the payments endpoint.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Payment {
    /// The sender's id. The API puts it under the wire key "id" even
    /// though it identifies the payer, not the payment.
    #[serde(rename = "id")]
    pub from_id: String,
    pub recipient_id: String,
    pub currency: String,
    pub amount: f64,
    pub status: String,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>, // Catch unknown fields
}

/// Parameters for creating a payment.
///
/// Both ids are required and checked before anything goes on the wire;
/// currency defaults to [`DEFAULT_CURRENCY`] and amount to zero.
#[derive(Debug, Clone)]
pub struct PaymentRequest {
    pub from_id: Option<String>,
    pub recipient_id: Option<String>,
    pub currency_code: String,
    pub amount: f64,
}

impl Default for PaymentRequest {
    fn default() -> Self {
        Self {
            from_id: None,
            recipient_id: None,
            currency_code: DEFAULT_CURRENCY.to_string(),
            amount: 0.0,
        }
    }
}

impl PaymentRequest {
    pub fn new(from_id: impl Into<String>, recipient_id: impl Into<String>) -> Self {
        Self {
            from_id: Some(from_id.into()),
            recipient_id: Some(recipient_id.into()),
            ..Self::default()
        }
    }

    pub fn amount(mut self, amount: f64) -> Self {
        self.amount = amount;
        self
    }

    pub fn currency(mut self, currency_code: impl Into<String>) -> Self {
        self.currency_code = currency_code.into();
        self
    }

    /// Check that both the sender and recipient ids are present and
    /// non-empty. Runs before any network call.
    pub fn validate(&self) -> Result<(&str, &str)> {
        let from_id = self
            .from_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| CoolpayError::MissingField("from_id".to_string()))?;
        let recipient_id = self
            .recipient_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| CoolpayError::MissingField("recipient_id".to_string()))?;
        Ok((from_id, recipient_id))
    }
}

// Raw API response structures for parsing

#[derive(Debug, Deserialize, Serialize)]
pub struct ApiLoginResponse {
    pub token: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ApiRecipientsResponse {
    pub recipients: Vec<Recipient>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ApiRecipientResponse {
    pub recipient: Recipient,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ApiPaymentsResponse {
    pub payments: Vec<Payment>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ApiPaymentResponse {
    pub payment: ApiPaymentStatus,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ApiPaymentStatus {
    pub status: String,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>, // Catch unknown fields
}
