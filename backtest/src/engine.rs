//! Equal-weight backtest engine
//!
//! Computes a daily-rebalanced equal-weight portfolio over aligned close
//! prices. Every symbol gets the same weight at every step and no transaction
//! costs are modeled.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::align::{align_series, AlignedSeries, MIN_SERIES_POINTS};
use crate::benchmark::normalize_benchmark;
use crate::drawdown::drawdown_series;
use crate::metrics::{compute_metrics, TRADING_DAYS_PER_YEAR};
use crate::types::{BacktestResult, PricePoint, SymbolSeries};

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Minimum bars a symbol needs to be included
    #[serde(default = "default_min_points")]
    pub min_points: usize,

    /// Trading days per year for annualization
    #[serde(default = "default_trading_days")]
    pub trading_days: u32,
}

fn default_min_points() -> usize {
    MIN_SERIES_POINTS
}

fn default_trading_days() -> u32 {
    TRADING_DAYS_PER_YEAR
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_points: default_min_points(),
            trading_days: default_trading_days(),
        }
    }
}

/// NAV curve and the per-step returns that produced it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NavCurve {
    /// NAV per aligned date, starting at 1.0
    pub nav: Vec<f64>,

    /// Portfolio return per step, one shorter than `nav`
    pub returns: Vec<f64>,
}

/// Equal-weight backtest engine
#[derive(Debug, Clone, Default)]
pub struct EqualWeightEngine {
    config: EngineConfig,
}

impl EqualWeightEngine {
    /// Create a new engine
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run the backtest over raw per-symbol series
    ///
    /// Alignment drops short series first. With no symbol or no common date
    /// the result is empty; a single common date gives `nav = [1.0]` and no
    /// metrics.
    pub fn run(&self, series: &[SymbolSeries]) -> BacktestResult {
        let aligned = align_series(series, self.config.min_points);

        if !aligned.excluded.is_empty() {
            info!(
                excluded = ?aligned.excluded,
                min_points = self.config.min_points,
                "Symbols excluded from equal-weight backtest"
            );
        }

        self.run_aligned(&aligned)
    }

    /// Run the backtest and attach a benchmark curve when it covers every date
    pub fn run_with_benchmark(
        &self,
        series: &[SymbolSeries],
        benchmark: Option<&[PricePoint]>,
    ) -> BacktestResult {
        let result = self.run(series);
        match benchmark {
            Some(points) if !result.is_empty() => {
                let benchmark_nav = normalize_benchmark(points, &result.dates);
                result.with_benchmark(benchmark_nav)
            }
            _ => result,
        }
    }

    /// Run the backtest over already aligned series
    pub fn run_aligned(&self, aligned: &AlignedSeries) -> BacktestResult {
        if aligned.symbol_count() == 0 || aligned.is_empty() {
            debug!(
                symbols = aligned.symbol_count(),
                "No common trading dates, returning empty backtest"
            );
            return BacktestResult::empty();
        }

        let curve = equal_weight_nav(aligned);
        let metrics = compute_metrics(&curve.nav, &curve.returns, self.config.trading_days);
        let drawdown = drawdown_series(&curve.nav);

        debug!(
            symbols = aligned.symbol_count(),
            dates = aligned.dates.len(),
            final_nav = curve.nav.last().copied().unwrap_or(1.0),
            "Equal-weight backtest complete"
        );

        BacktestResult {
            dates: aligned.dates.clone(),
            nav: curve.nav,
            benchmark_nav: Vec::new(),
            drawdown,
            metrics,
        }
    }
}

/// Daily-rebalanced equal-weight NAV over aligned closes
///
/// The step return is the arithmetic mean of every symbol's simple return.
/// Symbols with a missing, zero or non-finite price at either end of a step
/// are left out of that step; a step with no usable symbol returns 0.
pub fn equal_weight_nav(aligned: &AlignedSeries) -> NavCurve {
    if aligned.dates.is_empty() {
        return NavCurve::default();
    }

    let mut nav = Vec::with_capacity(aligned.dates.len());
    let mut returns = Vec::with_capacity(aligned.dates.len().saturating_sub(1));
    nav.push(1.0);

    for window in aligned.dates.windows(2) {
        let (d0, d1) = (&window[0], &window[1]);

        let step_returns: Vec<f64> = aligned
            .closes
            .values()
            .filter_map(|lookup| {
                let c0 = *lookup.get(d0)?;
                let c1 = *lookup.get(d1)?;
                simple_return(c0, c1)
            })
            .collect();

        let r = if step_returns.is_empty() {
            0.0
        } else {
            step_returns.iter().sum::<f64>() / step_returns.len() as f64
        };
        let r = if r.is_finite() { r } else { 0.0 };

        // a step that would overflow NAV counts as flat
        let last = nav[nav.len() - 1];
        let next = last * (1.0 + r);
        let (next, r) = if next.is_finite() { (next, r) } else { (last, 0.0) };

        nav.push(next);
        returns.push(r);
    }

    NavCurve { nav, returns }
}

/// Simple return `c1 / c0 - 1`, `None` when either price is unusable
pub(crate) fn simple_return(c0: f64, c1: f64) -> Option<f64> {
    if c0 == 0.0 || !c0.is_finite() || !c1.is_finite() {
        return None;
    }
    let r = c1 / c0 - 1.0;
    r.is_finite().then_some(r)
}
