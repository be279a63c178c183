use crate::client::CoolpayClient;
use crate::errors::Result;
use coolpay_core::{Payment, PaymentRequest, Recipient};

/// High-level entry point for the Coolpay API
pub struct Coolpay {
    api_client: CoolpayClient,
}

impl Coolpay {
    /// Create a new Coolpay instance with credentials
    pub fn new(username: impl Into<String>, api_key: impl Into<String>) -> Self {
        let api_client = CoolpayClient::new(username, api_key);
        Self { api_client }
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        let api_client = CoolpayClient::from_env()?;
        Ok(Self { api_client })
    }

    /// Log in and cache the bearer token
    pub async fn authenticate(&self) -> Result<()> {
        self.api_client.authenticate().await
    }

    /// List every recipient visible to the authenticated user
    pub async fn list_recipients(&self) -> Result<Vec<Recipient>> {
        self.api_client.search_recipients(None).await
    }

    /// Search recipients by name
    pub async fn search_recipients(&self, query: &str) -> Result<Vec<Recipient>> {
        self.api_client.search_recipients(Some(query)).await
    }

    /// Find a recipient by exact name
    pub async fn find_recipient_by_name(&self, name: &str) -> Result<Option<Recipient>> {
        let recipients = self.api_client.search_recipients(Some(name)).await?;

        Ok(recipients.into_iter().find(|r| r.name == name))
    }

    /// Create a recipient and return its id
    pub async fn create_recipient(&self, name: &str) -> Result<String> {
        self.api_client.create_recipient(name).await
    }

    /// List all payments
    pub async fn list_payments(&self) -> Result<Vec<Payment>> {
        self.api_client.list_payments().await
    }

    /// Create a payment from a full request
    pub async fn create_payment(&self, request: PaymentRequest) -> Result<String> {
        self.api_client.create_payment(request).await
    }

    /// Send an amount in the default currency between two recipient ids
    pub async fn pay(&self, from_id: &str, recipient_id: &str, amount: f64) -> Result<String> {
        self.api_client
            .create_payment(PaymentRequest::new(from_id, recipient_id).amount(amount))
            .await
    }
}
