use std::time::Duration;
use thiserror::Error;

/// Failure of one call (or one paginated sequence of calls) to the UptimeRobot API.
///
/// Cloneable so a failed collection can be carried inside a published snapshot.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Rate limited by UptimeRobot: {message}")]
    RateLimited {
        message: String,
        retry_after: Option<Duration>,
    },

    #[error("Network error: {0}")]
    Network(String),

    #[error("UptimeRobot API error: {0}")]
    Upstream(String),
}

impl ApiError {
    /// Stable label value for the error-kind metric.
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Auth(_) => "auth",
            ApiError::RateLimited { .. } => "rate_limit",
            ApiError::Network(_) => "network",
            ApiError::Upstream(_) => "upstream",
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Network(format!("request timed out: {}", err))
        } else if err.is_connect() || err.is_request() {
            ApiError::Network(err.to_string())
        } else if err.is_decode() {
            ApiError::Upstream(format!("malformed response body: {}", err))
        } else {
            ApiError::Upstream(err.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum ExporterError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, ExporterError>;
