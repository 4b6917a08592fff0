//! Error types for the backtest core

use thiserror::Error;

/// Errors raised by the backtest core
///
/// Most of the pipeline degrades to empty results instead of failing; these
/// cover canvas validation and I/O at the crate boundaries.
#[derive(Error, Debug)]
pub enum BacktestError {
    #[error("Invalid canvas {width}x{height} with padding {padding}")]
    InvalidCanvas {
        width: f64,
        height: f64,
        padding: f64,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BacktestError>;
