//! Benchmark normalization against the portfolio's aligned dates

use std::collections::HashMap;

use tracing::debug;

use crate::types::{DateKey, PricePoint};

/// Rebase a benchmark price series onto the portfolio dates
///
/// The benchmark must cover every date in `dates`; a benchmark that only
/// covers a subset is rejected and an empty curve is returned instead of a
/// partially filled one. The curve is rebased so that its first value is 1.0.
pub fn normalize_benchmark(points: &[PricePoint], dates: &[DateKey]) -> Vec<f64> {
    if points.is_empty() || dates.is_empty() {
        return Vec::new();
    }

    let lookup: HashMap<DateKey, f64> = points.iter().map(|p| (p.key(), p.close)).collect();

    let closes: Vec<f64> = dates.iter().filter_map(|d| lookup.get(d).copied()).collect();
    if closes.len() != dates.len() {
        debug!(
            covered = closes.len(),
            required = dates.len(),
            "Benchmark does not cover every portfolio date, dropping it"
        );
        return Vec::new();
    }

    rebase(&closes)
}

/// Divide every value by the first one
///
/// Returns an empty curve when the base is zero or any rebased value is not
/// finite.
pub fn rebase(values: &[f64]) -> Vec<f64> {
    let Some(&base) = values.first() else {
        return Vec::new();
    };
    if base == 0.0 || !base.is_finite() {
        return Vec::new();
    }

    let rebased: Vec<f64> = values.iter().map(|v| v / base).collect();
    if rebased.iter().all(|v| v.is_finite()) {
        rebased
    } else {
        Vec::new()
    }
}
