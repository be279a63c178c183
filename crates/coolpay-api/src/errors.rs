use thiserror::Error;

/// API-specific errors for coolpay-api
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),

    #[error("Core domain error: {0}")]
    Core(#[from] coolpay_core::CoolpayError),

    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

#[derive(Error, Debug)]
pub enum HttpError {
    /// Any non-2xx response. Carries the reason phrase and raw body so
    /// callers can see what the service actually said.
    #[error("HTTP error {status} {reason}: {body}")]
    Status {
        status: u16,
        reason: String,
        body: String,
    },

    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, ApiError>;
