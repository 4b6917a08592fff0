//! Date alignment across symbols
//!
//! Reduces several price histories to the trading dates every one of them
//! shares. Short or empty histories are dropped before the intersection
//! instead of punching holes into it.

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::types::{DateKey, SymbolSeries};

/// Minimum number of bars a symbol needs to take part in a backtest
pub const MIN_SERIES_POINTS: usize = 60;

/// Close-price lookups keyed by aligned date, one per included symbol
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlignedSeries {
    /// Common trading dates, ascending
    pub dates: Vec<DateKey>,

    /// Symbol -> (date -> close)
    pub closes: BTreeMap<String, HashMap<DateKey, f64>>,

    /// Symbols dropped for being empty or too short
    pub excluded: Vec<String>,
}

impl AlignedSeries {
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn symbol_count(&self) -> usize {
        self.closes.len()
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.closes.keys().map(String::as_str)
    }

    /// Close of `symbol` on `date`, if present
    pub fn close(&self, symbol: &str, date: &DateKey) -> Option<f64> {
        self.closes.get(symbol).and_then(|m| m.get(date)).copied()
    }
}

/// Build a date -> close lookup for one series
///
/// Later bars win when the provider repeats a date.
pub fn close_lookup(series: &SymbolSeries) -> HashMap<DateKey, f64> {
    series
        .points
        .iter()
        .map(|p| (p.key(), p.close))
        .filter(|(key, _)| !key.as_str().is_empty())
        .collect()
}

/// Align `series` on their common trading dates
///
/// Symbols with fewer than `min_points` bars are excluded entirely. An empty
/// intersection yields an `AlignedSeries` with no dates rather than an error.
pub fn align_series(series: &[SymbolSeries], min_points: usize) -> AlignedSeries {
    let mut closes = BTreeMap::new();
    let mut excluded = Vec::new();

    for s in series {
        if s.is_empty() || s.len() < min_points {
            debug!(
                symbol = %s.symbol,
                points = s.len(),
                min_points,
                "Excluding symbol from alignment"
            );
            excluded.push(s.symbol.clone());
            continue;
        }
        closes.insert(s.symbol.clone(), close_lookup(s));
    }

    let dates = intersect_dates(&closes);

    AlignedSeries {
        dates,
        closes,
        excluded,
    }
}

/// Sorted ascending intersection of the date keys of every lookup
fn intersect_dates(closes: &BTreeMap<String, HashMap<DateKey, f64>>) -> Vec<DateKey> {
    if closes.is_empty() {
        return Vec::new();
    }

    let mut counts: BTreeMap<&DateKey, usize> = BTreeMap::new();
    for lookup in closes.values() {
        for key in lookup.keys() {
            *counts.entry(key).or_default() += 1;
        }
    }

    let required = closes.len();
    counts
        .into_iter()
        .filter(|(_, n)| *n == required)
        .map(|(key, _)| key.clone())
        .collect()
}
