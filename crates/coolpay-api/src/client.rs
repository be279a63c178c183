use crate::errors::{ApiError, HttpError, Result};
use coolpay_core::{
    ApiLoginResponse, ApiPaymentResponse, ApiPaymentsResponse, ApiRecipientResponse,
    ApiRecipientsResponse, Payment, PaymentRequest, Recipient,
};
use log::{debug, error, info, trace};
use reqwest::{Client, Response};
use tokio::sync::Mutex;

/// Default Coolpay service host, used when no base URL is configured.
pub const DEFAULT_BASE_URL: &str = "https://coolpay.herokuapp.com";

/// Trait for providing configuration to the API client
/// This allows the embedding application to implement config without circular dependencies
pub trait ApiConfig {
    type Error;

    /// Get the username for authentication
    fn get_username(&self) -> std::result::Result<Option<String>, Self::Error>;

    /// Get the API key for authentication
    fn get_api_key(&self) -> std::result::Result<Option<String>, Self::Error>;

    /// Get the base URL for the API (optional, defaults to the official service)
    fn get_base_url(&self) -> std::result::Result<Option<String>, Self::Error> {
        Ok(None)
    }
}

/// Session state for one client instance.
///
/// The only transition is `Unauthenticated -> Authenticated`, performed by a
/// successful login. There is no expiry and no re-login on 401.
#[derive(Debug)]
enum Session {
    Unauthenticated,
    Authenticated(String),
}

/// HTTP client for the Coolpay payment API.
///
/// Holds the connection configuration and the cached bearer token. Operations
/// that need authentication log in transparently on first use and reuse the
/// token for the lifetime of the instance.
#[derive(Debug)]
pub struct CoolpayClient {
    client: Client,
    username: Option<String>,
    api_key: Option<String>,
    base_url: String,
    session: Mutex<Session>,
}

impl Default for CoolpayClient {
    fn default() -> Self {
        Self {
            client: Client::new(),
            username: None,
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            session: Mutex::new(Session::Unauthenticated),
        }
    }
}

// Mask a credential for log output, keeping at most the first and last 4 chars.
fn mask(secret: &str) -> String {
    format!(
        "{}...{}",
        &secret[..4.min(secret.len())],
        if secret.len() > 4 {
            &secret[secret.len().saturating_sub(4)..]
        } else {
            ""
        }
    )
}

impl CoolpayClient {
    /// Create a new API client with credentials and the default base URL
    pub fn new(username: impl Into<String>, api_key: impl Into<String>) -> Self {
        let username = username.into();
        let api_key = api_key.into();

        debug!("Creating CoolpayClient");
        debug!("  Username: {}", username);
        debug!("  API Key: {}", mask(&api_key));

        Self {
            username: Some(username),
            api_key: Some(api_key),
            ..Self::default()
        }
    }

    /// Create an API client with a custom base URL
    pub fn with_base_url(
        username: impl Into<String>,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        let base_url = base_url.into();
        debug!("Creating CoolpayClient with custom base URL: {}", base_url);
        Self {
            base_url,
            ..Self::new(username, api_key)
        }
    }

    /// Create an API client from environment variables
    pub fn from_env() -> Result<Self> {
        debug!("Creating CoolpayClient from environment variables");
        let username = std::env::var("COOLPAY_USERNAME").map_err(|_| {
            error!("COOLPAY_USERNAME environment variable not set");
            ApiError::Config("COOLPAY_USERNAME environment variable not set".to_string())
        })?;
        let api_key = std::env::var("COOLPAY_API_KEY").map_err(|_| {
            error!("COOLPAY_API_KEY environment variable not set");
            ApiError::Config("COOLPAY_API_KEY environment variable not set".to_string())
        })?;

        match std::env::var("COOLPAY_BASE_URL") {
            Ok(base_url) => Ok(Self::with_base_url(username, api_key, base_url)),
            Err(_) => Ok(Self::new(username, api_key)),
        }
    }

    /// Create an API client from any configuration implementing the ApiConfig trait
    pub fn from_config<C>(config: &C) -> std::result::Result<Self, C::Error>
    where
        C: ApiConfig,
    {
        debug!("Creating CoolpayClient from config");
        let username = config.get_username()?;
        let api_key = config.get_api_key()?;
        let base_url = config.get_base_url()?;

        if let Some(ref url) = base_url {
            debug!("Got custom base URL from config: {}", url);
        } else {
            debug!("Using default base URL");
        }

        Ok(Self {
            username,
            api_key,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            ..Self::default()
        })
    }

    /// The bearer token currently held, if any.
    pub async fn token(&self) -> Option<String> {
        match &*self.session.lock().await {
            Session::Authenticated(token) => Some(token.clone()),
            Session::Unauthenticated => None,
        }
    }

    fn endpoint_url(&self, endpoint: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        )
    }

    /// Perform the login round trip and return the issued token.
    async fn login(&self) -> Result<String> {
        let url = self.endpoint_url("api/login");

        debug!("HTTP POST request to: {}", url);
        debug!(
            "  Logging in as: {}",
            self.username.as_deref().unwrap_or("<none>")
        );
        trace!(
            "  API Key: {}",
            self.api_key.as_deref().map(mask).unwrap_or_default()
        );

        let body = serde_json::json!({
            "username": self.username,
            "apikey": self.api_key,
        });

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!("Login request failed: {:?}", e);
                HttpError::Request(e)
            })?;

        debug!("Response status: {}", response.status());

        let response = self.handle_response(response).await?;
        let raw: ApiLoginResponse = response.json().await.map_err(HttpError::Request)?;

        info!("Successfully logged in");

        Ok(raw.token)
    }

    /// Perform login and store the token, replacing any token already held.
    pub async fn authenticate(&self) -> Result<()> {
        let token = self.login().await?;
        *self.session.lock().await = Session::Authenticated(token);
        Ok(())
    }

    /// Return the held token, logging in first if there is none.
    ///
    /// The session lock is held across the login round trip so concurrent
    /// callers on one instance never race duplicate logins.
    async fn ensure_authenticated(&self) -> Result<String> {
        let mut session = self.session.lock().await;
        match &*session {
            Session::Authenticated(token) => Ok(token.clone()),
            Session::Unauthenticated => {
                debug!("No session token held, logging in first");
                let token = self.login().await?;
                *session = Session::Authenticated(token.clone());
                Ok(token)
            }
        }
    }

    /// Make an authenticated GET request
    async fn authenticated_get(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<Response> {
        let token = self.ensure_authenticated().await?;
        let url = self.endpoint_url(endpoint);

        debug!("HTTP GET request to: {}", url);
        trace!("  Authorization: Bearer {}", mask(&token));
        trace!("  Content-Type: application/json");

        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", token))
            .header("Content-Type", "application/json")
            .query(params)
            .send()
            .await
            .map_err(|e| {
                error!("GET request failed: {:?}", e);
                HttpError::Request(e)
            })?;

        debug!("Response status: {}", response.status());

        self.handle_response(response).await
    }

    /// Make an authenticated POST request
    async fn authenticated_post(
        &self,
        endpoint: &str,
        body: serde_json::Value,
    ) -> Result<Response> {
        let token = self.ensure_authenticated().await?;
        let url = self.endpoint_url(endpoint);

        debug!("HTTP POST request to: {}", url);
        trace!("  Authorization: Bearer {}", mask(&token));
        trace!("  Content-Type: application/json");
        trace!(
            "Request body: {}",
            serde_json::to_string_pretty(&body).unwrap_or_else(|_| "Invalid JSON".to_string())
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", token))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!("POST request failed: {:?}", e);
                HttpError::Request(e)
            })?;

        debug!("Response status: {}", response.status());

        self.handle_response(response).await
    }

    /// Handle HTTP response and convert non-success statuses to errors
    async fn handle_response(&self, response: Response) -> Result<Response> {
        let status = response.status();

        if status.is_success() {
            debug!("Request successful with status: {}", status);
            Ok(response)
        } else {
            let reason = status.canonical_reason().unwrap_or("Unknown").to_string();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            error!("Request failed with status: {}", status);
            debug!("Error response body: {}", body);

            Err(ApiError::Http(HttpError::Status {
                status: status.as_u16(),
                reason,
                body,
            }))
        }
    }

    /// Search recipients, optionally filtered by name.
    ///
    /// An empty result set means no matches, not an error.
    pub async fn search_recipients(&self, query: Option<&str>) -> Result<Vec<Recipient>> {
        debug!("Fetching recipients");

        let params: Vec<(&str, &str)> = match query {
            Some(name) => vec![("name", name)],
            None => Vec::new(),
        };

        let response = self.authenticated_get("api/recipients", &params).await?;
        let raw: ApiRecipientsResponse = response.json().await.map_err(HttpError::Request)?;

        info!("Successfully fetched {} recipients", raw.recipients.len());

        Ok(raw.recipients)
    }

    /// Create a recipient and return its server-assigned id
    pub async fn create_recipient(&self, name: &str) -> Result<String> {
        debug!("Creating recipient: {}", name);

        // The upstream docs describe a name query parameter for this call;
        // the API actually wants the name in the request body.
        let body = serde_json::json!({
            "recipient": { "name": name },
        });

        let response = self.authenticated_post("api/recipients", body).await?;
        let raw: ApiRecipientResponse = response.json().await.map_err(HttpError::Request)?;

        info!("Successfully created recipient {}", raw.recipient.id);

        Ok(raw.recipient.id)
    }

    /// List all payments visible to the authenticated user
    pub async fn list_payments(&self) -> Result<Vec<Payment>> {
        debug!("Fetching payments");

        let response = self.authenticated_get("api/payments", &[]).await?;
        let raw: ApiPaymentsResponse = response.json().await.map_err(HttpError::Request)?;

        info!("Successfully fetched {} payments", raw.payments.len());

        Ok(raw.payments)
    }

    /// Create a payment and return its status (e.g. "processing").
    ///
    /// Fails before any network call, including the implicit login, when the
    /// request is missing either id.
    pub async fn create_payment(&self, request: PaymentRequest) -> Result<String> {
        let (from_id, recipient_id) = request.validate()?;

        debug!(
            "Creating payment of {} {} from {} to {}",
            request.amount, request.currency_code, from_id, recipient_id
        );

        let body = serde_json::json!({
            "payment": {
                "id": from_id,  // Note: API expects the sender id under "id", not a payment id
                "recipient_id": recipient_id,
                "currency": request.currency_code,
                "amount": request.amount,
            }
        });

        let response = self.authenticated_post("api/payments", body).await?;
        let raw: ApiPaymentResponse = response.json().await.map_err(HttpError::Request)?;

        info!("Payment accepted with status: {}", raw.payment.status);

        Ok(raw.payment.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server, ServerGuard};
    use serde_json::json;

    const USERNAME: &str = "GarethH";
    const API_KEY: &str = "945AF053C4694E1E";
    const TOKEN: &str = "eyJhbGciOiJIUzUxMiIsInR5cCI6IkpXVCJ9";

    fn test_client(server: &ServerGuard) -> CoolpayClient {
        CoolpayClient::with_base_url(USERNAME, API_KEY, server.url())
    }

    fn mock_login(server: &mut ServerGuard) -> mockito::Mock {
        server
            .mock("POST", "/api/login")
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(json!({
                "username": USERNAME,
                "apikey": API_KEY,
            })))
            .with_status(201)
            .with_header("content-type", "application/json")
            .with_body(json!({ "token": TOKEN }).to_string())
    }

    #[tokio::test]
    async fn test_constructor_defaults() {
        let client = CoolpayClient::default();
        assert_eq!(client.base_url, DEFAULT_BASE_URL);
        assert!(client.username.is_none());
        assert!(client.api_key.is_none());
        assert!(client.token().await.is_none());
    }

    #[tokio::test]
    async fn test_authenticate_stores_token() {
        let mut server = Server::new_async().await;
        let mock = mock_login(&mut server).create_async().await;

        let client = test_client(&server);
        client.authenticate().await.unwrap();

        assert_eq!(client.token().await.as_deref(), Some(TOKEN));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_authenticate_invalid_credentials() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/login")
            .with_status(404)
            .with_body(r#"{"errors": "invalid credentials"}"#)
            .create_async()
            .await;

        let client = CoolpayClient::with_base_url("NotValid", "still_not_valid", server.url());
        let err = client.authenticate().await.unwrap_err();

        match err {
            ApiError::Http(HttpError::Status {
                status,
                reason,
                body,
            }) => {
                assert_eq!(status, 404);
                assert_eq!(reason, "Not Found");
                assert!(body.contains("invalid credentials"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        // A failed login leaves the session unauthenticated
        assert!(client.token().await.is_none());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_authenticate_replaces_held_token() {
        let mut server = Server::new_async().await;
        let mock = mock_login(&mut server).expect(2).create_async().await;

        let client = test_client(&server);
        client.authenticate().await.unwrap();
        // Explicit authenticate always performs the round trip
        client.authenticate().await.unwrap();

        assert_eq!(client.token().await.as_deref(), Some(TOKEN));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_search_recipients_unfiltered() {
        let mut server = Server::new_async().await;
        let login = mock_login(&mut server).create_async().await;
        let recipients = server
            .mock("GET", "/api/recipients")
            .match_header("authorization", format!("Bearer {}", TOKEN).as_str())
            .with_status(200)
            .with_body(
                json!({
                    "recipients": [
                        { "id": "6e7b146e-5957-11e6-8b77-86f30ca893d3", "name": "Harry Tester" },
                    ]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = test_client(&server);
        let result = client.search_recipients(None).await.unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].name, "Harry Tester");
        login.assert_async().await;
        recipients.assert_async().await;
    }

    #[tokio::test]
    async fn test_search_recipients_no_match_is_empty() {
        let mut server = Server::new_async().await;
        let _login = mock_login(&mut server).create_async().await;
        let recipients = server
            .mock("GET", "/api/recipients")
            .match_query(Matcher::UrlEncoded(
                "name".into(),
                "this should never be found".into(),
            ))
            .with_status(200)
            .with_body(r#"{"recipients": []}"#)
            .create_async()
            .await;

        let client = test_client(&server);
        let result = client
            .search_recipients(Some("this should never be found"))
            .await
            .unwrap();

        assert!(result.is_empty());
        recipients.assert_async().await;
    }

    #[tokio::test]
    async fn test_create_recipient_returns_uuid() {
        let mut server = Server::new_async().await;
        let _login = mock_login(&mut server).create_async().await;
        let create = server
            .mock("POST", "/api/recipients")
            .match_header("authorization", format!("Bearer {}", TOKEN).as_str())
            .match_body(Matcher::Json(json!({
                "recipient": { "name": "Harry Tester" }
            })))
            .with_status(201)
            .with_body(
                json!({
                    "recipient": { "id": "6e7b146e-5957-11e6-8b77-86f30ca893d3", "name": "Harry Tester" }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = test_client(&server);
        let id = client.create_recipient("Harry Tester").await.unwrap();

        let uuid = regex::Regex::new(
            r"^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$",
        )
        .unwrap();
        assert!(uuid.is_match(&id), "id is not a UUID: {}", id);
        create.assert_async().await;
    }

    #[tokio::test]
    async fn test_list_payments() {
        let mut server = Server::new_async().await;
        let _login = mock_login(&mut server).create_async().await;
        let payments = server
            .mock("GET", "/api/payments")
            .match_header("authorization", format!("Bearer {}", TOKEN).as_str())
            .with_status(200)
            .with_body(r#"{"payments": []}"#)
            .create_async()
            .await;

        let client = test_client(&server);
        let result = client.list_payments().await.unwrap();

        assert!(result.is_empty());
        payments.assert_async().await;
    }

    #[tokio::test]
    async fn test_create_payment_returns_status() {
        let mut server = Server::new_async().await;
        let _login = mock_login(&mut server).create_async().await;
        let payment = server
            .mock("POST", "/api/payments")
            .match_body(Matcher::Json(json!({
                "payment": {
                    "id": "sender-id",
                    "recipient_id": "recipient-id",
                    "currency": "GBP",
                    "amount": 10.0,
                }
            })))
            .with_status(201)
            .with_body(r#"{"payment": {"status": "processing"}}"#)
            .create_async()
            .await;

        let client = test_client(&server);
        let status = client
            .create_payment(PaymentRequest::new("sender-id", "recipient-id").amount(10.0))
            .await
            .unwrap();

        assert_eq!(status, "processing");
        payment.assert_async().await;
    }

    #[tokio::test]
    async fn test_create_payment_validates_before_any_request() {
        let mut server = Server::new_async().await;
        let login = server.mock("POST", "/api/login").expect(0).create_async().await;
        let payments = server
            .mock("POST", "/api/payments")
            .expect(0)
            .create_async()
            .await;

        let client = test_client(&server);

        let missing_from = PaymentRequest {
            recipient_id: Some("recipient-id".to_string()),
            amount: 10.0,
            ..Default::default()
        };
        assert!(matches!(
            client.create_payment(missing_from).await,
            Err(ApiError::Core(_))
        ));

        let missing_recipient = PaymentRequest {
            from_id: Some("sender-id".to_string()),
            amount: 10.0,
            ..Default::default()
        };
        assert!(matches!(
            client.create_payment(missing_recipient).await,
            Err(ApiError::Core(_))
        ));

        login.assert_async().await;
        payments.assert_async().await;
    }

    #[tokio::test]
    async fn test_login_happens_once_across_calls() {
        let mut server = Server::new_async().await;
        let login = mock_login(&mut server).expect(1).create_async().await;
        let recipients = server
            .mock("GET", "/api/recipients")
            .match_header("authorization", format!("Bearer {}", TOKEN).as_str())
            .with_status(200)
            .with_body(r#"{"recipients": []}"#)
            .expect(2)
            .create_async()
            .await;

        let client = test_client(&server);
        client.search_recipients(None).await.unwrap();
        client.search_recipients(None).await.unwrap();

        login.assert_async().await;
        recipients.assert_async().await;
    }
}
