//! Normalization of backtest-service responses
//!
//! The service has shipped several spellings of the same metrics
//! (`ann_return`/`annReturn`, `mdd`/`max_dd`/`maxDD`, ...) and both drawdown
//! sign conventions. Everything is folded into the canonical
//! [`BacktestResult`] here, at the boundary, so nothing downstream needs to
//! inspect raw shapes.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::benchmark::rebase;
use crate::drawdown::drawdown_series;
use crate::engine::simple_return;
use crate::metrics::compute_metrics;
use crate::types::{BacktestMetrics, BacktestResult, DateKey};

/// Metrics block as sent by the service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceMetrics {
    #[serde(
        default,
        alias = "annReturn",
        alias = "annualized_return",
        alias = "annualizedReturn"
    )]
    pub ann_return: Option<f64>,

    #[serde(
        default,
        alias = "max_dd",
        alias = "maxDD",
        alias = "maxDd",
        alias = "max_drawdown",
        alias = "maxDrawdown"
    )]
    pub mdd: Option<f64>,

    #[serde(default, alias = "sharpe_ratio", alias = "sharpeRatio")]
    pub sharpe: Option<f64>,
}

impl ServiceMetrics {
    /// Canonical metrics; drawdown folded to a non-negative magnitude
    pub fn canonical(&self) -> BacktestMetrics {
        BacktestMetrics {
            ann_return: self.ann_return.filter(|v| v.is_finite()),
            mdd: self.mdd.filter(|v| v.is_finite()).map(f64::abs),
            sharpe: self.sharpe.filter(|v| v.is_finite()),
        }
    }
}

/// Backtest payload as sent by the service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceBacktestResponse {
    #[serde(default, alias = "date")]
    pub dates: Vec<String>,

    #[serde(default, alias = "equity")]
    pub nav: Vec<Option<f64>>,

    #[serde(default, alias = "benchmarkNav", alias = "benchmark")]
    pub benchmark_nav: Vec<Option<f64>>,

    #[serde(default, alias = "dd")]
    pub drawdown: Vec<Option<f64>>,

    #[serde(default)]
    pub metrics: Option<ServiceMetrics>,
}

impl ServiceBacktestResponse {
    /// Parse a raw JSON body
    pub fn from_json(body: &str) -> crate::error::Result<Self> {
        Ok(serde_json::from_str(body)?)
    }

    /// Fold into the canonical result
    ///
    /// A NAV that is missing, contains nulls or non-finite values, or does not
    /// line up with the dates makes the whole result empty, which callers
    /// treat as "no usable NAV". NAV and benchmark are rebased to 1.0; a
    /// benchmark that does not match NAV length is dropped. Metrics missing
    /// from the payload are computed locally with `trading_days`.
    pub fn into_result(self, trading_days: u32) -> BacktestResult {
        let dates: Vec<DateKey> = self.dates.iter().map(|d| DateKey::normalize(d)).collect();

        let Some(raw_nav) = finite(&self.nav) else {
            warn!("Service NAV contains missing or non-finite values");
            return BacktestResult::empty();
        };
        if raw_nav.is_empty() || raw_nav.len() != dates.len() {
            if !raw_nav.is_empty() {
                warn!(
                    nav = raw_nav.len(),
                    dates = dates.len(),
                    "Service NAV does not line up with its dates"
                );
            }
            return BacktestResult::empty();
        }

        let nav = rebase(&raw_nav);
        if nav.is_empty() {
            warn!("Service NAV cannot be rebased");
            return BacktestResult::empty();
        }

        let benchmark_nav = finite(&self.benchmark_nav)
            .map(|b| rebase(&b))
            .unwrap_or_default();

        let drawdown = match finite(&self.drawdown) {
            Some(dd) if dd.len() == nav.len() => {
                dd.into_iter().map(|v| v.abs().min(1.0)).collect()
            }
            _ => drawdown_series(&nav),
        };

        let returns: Vec<f64> = nav
            .windows(2)
            .map(|w| simple_return(w[0], w[1]).unwrap_or(0.0))
            .collect();
        let local = compute_metrics(&nav, &returns, trading_days);
        let metrics = self
            .metrics
            .map(|m| m.canonical())
            .unwrap_or_default()
            .or(local);

        BacktestResult {
            dates,
            nav,
            benchmark_nav: Vec::new(),
            drawdown,
            metrics,
        }
        .with_benchmark(benchmark_nav)
    }
}

fn finite(values: &[Option<f64>]) -> Option<Vec<f64>> {
    values
        .iter()
        .map(|v| v.filter(|x| x.is_finite()))
        .collect()
}
