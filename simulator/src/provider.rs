//! Provider traits for price series and the backtest service
//!
//! The simulator only sees these traits; the HTTP implementation lives in
//! [`crate::http`], tests plug in in-memory implementations.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use ag_backtest::{BacktestResult, PricePoint};

use crate::error::SimResult;

/// Rebalance frequency requested from the backtest service
///
/// The local fallback always rebalances daily.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rebalance {
    Daily,
    #[default]
    Weekly,
    Monthly,
}

impl fmt::Display for Rebalance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Rebalance::Daily => "daily",
            Rebalance::Weekly => "weekly",
            Rebalance::Monthly => "monthly",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for Rebalance {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "daily" | "d" => Ok(Rebalance::Daily),
            "weekly" | "w" => Ok(Rebalance::Weekly),
            "monthly" | "m" => Ok(Rebalance::Monthly),
            other => Err(format!("unknown rebalance frequency: {}", other)),
        }
    }
}

/// Backtest request as sent to the service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestRequest {
    /// Symbol pool, equally weighted
    pub symbols: Vec<String>,

    /// Lookback in weeks
    pub weeks: u32,

    /// Rebalance frequency
    pub rebalance: Rebalance,
}

impl BacktestRequest {
    pub fn new(symbols: Vec<String>, weeks: u32, rebalance: Rebalance) -> Self {
        Self {
            symbols,
            weeks,
            rebalance,
        }
    }

    /// Symbols trimmed, upper-cased and de-duplicated, order preserved
    pub fn normalized_symbols(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::with_capacity(self.symbols.len());
        for s in &self.symbols {
            let s = s.trim().to_ascii_uppercase();
            if !s.is_empty() && !out.contains(&s) {
                out.push(s);
            }
        }
        out
    }
}

/// Source of daily price history
#[async_trait]
pub trait PriceSeriesProvider: Send + Sync {
    /// Fetch up to `limit` daily bars for `symbol`, oldest first
    ///
    /// May return fewer bars than requested.
    async fn fetch_prices(&self, symbol: &str, limit: usize) -> SimResult<Vec<PricePoint>>;
}

/// Primary backtest service
#[async_trait]
pub trait BacktestService: Send + Sync {
    /// Run a backtest remotely
    ///
    /// Implementations return the canonical result; an empty NAV means the
    /// service had nothing usable.
    async fn run_backtest(&self, request: &BacktestRequest) -> SimResult<BacktestResult>;
}
