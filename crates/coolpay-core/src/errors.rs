use thiserror::Error;

/// Core domain errors - no I/O dependencies
#[derive(Error, Debug)]
pub enum CoolpayError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CoolpayError>;
