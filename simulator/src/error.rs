//! Error types for the simulator

use thiserror::Error;

/// Result type for simulator operations
pub type SimResult<T> = Result<T, SimError>;

/// Simulator error types
#[derive(Debug, Error)]
pub enum SimError {
    /// Service answered with a non-success status
    #[error("Service error from {endpoint} ({status}): {message}")]
    ServiceError {
        /// Endpoint that failed
        endpoint: String,
        /// HTTP status code
        status: u16,
        /// Response body or reason
        message: String,
    },

    /// Network error
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Invalid API response
    #[error("Invalid API response: {0}")]
    InvalidResponse(String),

    /// Local fallback could not produce any chartable data
    #[error("Local backtest failed: {0}")]
    FallbackFailed(String),

    /// Chart surface error
    #[error("Render surface error: {0}")]
    SurfaceError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Backtest core error
    #[error("Backtest error: {0}")]
    Backtest(#[from] ag_backtest::BacktestError),

    /// HTTP client error
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// YAML configuration error
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// URL parsing error
    #[error("URL error: {0}")]
    UrlError(#[from] url::ParseError),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
