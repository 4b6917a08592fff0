//! Performance metrics calculation
//!
//! Implements the risk/return summary shown next to the simulator chart:
//! - Annualized return: geometric, `nav_last ^ (days / steps) - 1`
//! - Maximum drawdown: largest peak-to-trough decline, as a positive fraction
//! - Sharpe ratio: mean / sample standard deviation, annualized by √days

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::drawdown;
use crate::types::BacktestMetrics;

/// Trading days per year used for annualization
pub const TRADING_DAYS_PER_YEAR: u32 = 252;

/// Performance metrics calculator over a NAV curve and its daily returns
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    /// NAV curve starting at 1.0
    nav: Vec<f64>,

    /// Per-step portfolio returns, `nav.len() - 1` long
    returns: Vec<f64>,

    /// Annualization factor
    trading_days: u32,
}

impl PerformanceMetrics {
    /// Create a new performance metrics calculator
    pub fn new(nav: Vec<f64>, returns: Vec<f64>) -> Self {
        Self {
            nav,
            returns,
            trading_days: TRADING_DAYS_PER_YEAR,
        }
    }

    /// Override the number of trading days per year
    pub fn with_trading_days(mut self, trading_days: u32) -> Self {
        self.trading_days = trading_days.max(1);
        self
    }

    /// Geometric annualized return
    ///
    /// The step count floors to 1 so a one-step curve still annualizes.
    pub fn annualized_return(&self) -> Option<f64> {
        let last = *self.nav.last()?;
        let steps = self.returns.len().max(1) as f64;
        let annualized = last.powf(self.trading_days as f64 / steps) - 1.0;
        annualized.is_finite().then_some(annualized)
    }

    /// Maximum drawdown as a non-negative fraction
    pub fn max_drawdown(&self) -> f64 {
        drawdown::max_drawdown(&self.nav)
    }

    /// Annualized Sharpe ratio
    ///
    /// Uses the sample (n-1) standard deviation. Returns 0 when the deviation
    /// is zero or undefined.
    pub fn sharpe_ratio(&self) -> f64 {
        if self.returns.is_empty() {
            return 0.0;
        }

        let mean = self.returns.iter().mean();
        let std_dev = self.returns.iter().std_dev();

        if !std_dev.is_finite() || std_dev == 0.0 || !mean.is_finite() {
            return 0.0;
        }

        mean / std_dev * (self.trading_days as f64).sqrt()
    }

    /// Full summary; empty when there is nothing to annualize
    pub fn summary(&self) -> BacktestMetrics {
        if self.nav.is_empty() || self.returns.is_empty() {
            return BacktestMetrics::default();
        }

        BacktestMetrics {
            ann_return: self.annualized_return(),
            mdd: Some(self.max_drawdown()),
            sharpe: Some(self.sharpe_ratio()),
        }
    }
}

/// Compute the metrics summary for a NAV curve and its returns
pub fn compute_metrics(nav: &[f64], returns: &[f64], trading_days: u32) -> BacktestMetrics {
    PerformanceMetrics::new(nav.to_vec(), returns.to_vec())
        .with_trading_days(trading_days)
        .summary()
}
