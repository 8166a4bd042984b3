use thiserror::Error;

/// Main error type for the watchdog daemon
#[derive(Error, Debug)]
pub enum SentinelError {
    // Configuration errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // Network errors
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Webhook delivery failed: {0}")]
    Webhook(String),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for SentinelError
pub type Result<T> = std::result::Result<T, SentinelError>;
