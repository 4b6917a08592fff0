//! Core data model shared by the alignment, engine and chart modules

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Daily OHLCV bar as delivered by the price-series provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    /// Raw date string (any of `2024-01-05`, `2024/01/05`, `20240105`, ISO timestamps)
    pub date: String,

    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
}

impl PricePoint {
    /// Bar with every price set to `close`
    pub fn from_close(date: impl Into<String>, close: f64) -> Self {
        Self {
            date: date.into(),
            open: close,
            high: close,
            low: close,
            close,
            volume: None,
        }
    }

    /// Normalized date key of this bar
    pub fn key(&self) -> DateKey {
        DateKey::normalize(&self.date)
    }
}

/// Price history for one symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolSeries {
    pub symbol: String,
    pub points: Vec<PricePoint>,
}

impl SymbolSeries {
    pub fn new(symbol: impl Into<String>, points: Vec<PricePoint>) -> Self {
        Self {
            symbol: symbol.into(),
            points,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Comparable trading-date key in `YYYYMMDD` form
///
/// Lexicographic order of keys equals chronological order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DateKey(String);

impl DateKey {
    /// Normalize a raw date string
    ///
    /// Only the first 10 characters are considered (dropping any time part),
    /// then every separator is removed.
    pub fn normalize(raw: &str) -> Self {
        let key: String = raw
            .trim()
            .chars()
            .take(10)
            .filter(|c| c.is_ascii_digit())
            .collect();
        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Calendar date, when the key is a valid `YYYYMMDD`
    pub fn to_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.0, "%Y%m%d").ok()
    }

    /// `YYYY-MM-DD` rendering, falling back to the raw key
    pub fn to_iso(&self) -> String {
        self.to_date()
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| self.0.clone())
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DateKey {
    fn from(raw: &str) -> Self {
        Self::normalize(raw)
    }
}

/// Risk/return summary of a NAV curve
///
/// Every field is optional: absent means "not computable", e.g. a single
/// aligned date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BacktestMetrics {
    /// Geometric annualized return
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ann_return: Option<f64>,

    /// Maximum drawdown as a non-negative fraction of the running peak
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mdd: Option<f64>,

    /// Annualized Sharpe ratio (zero risk-free rate)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sharpe: Option<f64>,
}

impl BacktestMetrics {
    pub fn is_empty(&self) -> bool {
        self.ann_return.is_none() && self.mdd.is_none() && self.sharpe.is_none()
    }

    /// Fill absent fields from `other`
    pub fn or(self, other: BacktestMetrics) -> Self {
        Self {
            ann_return: self.ann_return.or(other.ann_return),
            mdd: self.mdd.or(other.mdd),
            sharpe: self.sharpe.or(other.sharpe),
        }
    }
}

/// Outcome of one backtest run, consumed by the chart renderer and CSV export
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    /// Aligned trading dates, ascending
    pub dates: Vec<DateKey>,

    /// Portfolio NAV, `nav[0] == 1.0`
    pub nav: Vec<f64>,

    /// Benchmark NAV rebased to 1.0; empty or exactly `nav.len()` long
    #[serde(default)]
    pub benchmark_nav: Vec<f64>,

    /// Peak-relative drawdown magnitudes in `[0, 1]`; may be empty
    #[serde(default)]
    pub drawdown: Vec<f64>,

    #[serde(default)]
    pub metrics: BacktestMetrics,
}

impl BacktestResult {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nav.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nav.is_empty()
    }

    pub fn has_benchmark(&self) -> bool {
        !self.benchmark_nav.is_empty()
    }

    /// Attach a benchmark curve; a curve of any other length is dropped
    pub fn with_benchmark(mut self, benchmark_nav: Vec<f64>) -> Self {
        self.benchmark_nav = if benchmark_nav.len() == self.nav.len() {
            benchmark_nav
        } else {
            Vec::new()
        };
        self
    }

    pub fn final_nav(&self) -> Option<f64> {
        self.nav.last().copied()
    }

    /// Cumulative return over the whole run
    pub fn total_return(&self) -> Option<f64> {
        self.final_nav().map(|nav| nav - 1.0)
    }

    /// Number of daily return steps
    pub fn return_count(&self) -> usize {
        self.nav.len().saturating_sub(1)
    }

    /// Drawdown magnitudes, computed from NAV when the result carries none
    pub fn drawdown_or_computed(&self) -> Vec<f64> {
        if self.drawdown.len() == self.nav.len() && !self.drawdown.is_empty() {
            self.drawdown.clone()
        } else {
            crate::drawdown::drawdown_series(&self.nav)
        }
    }
}
