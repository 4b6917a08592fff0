//! Drawdown series
//!
//! The canonical representation is the peak-relative magnitude
//! `1 - nav / peak`, always in `[0, 1]` for positive NAVs. Charts and CSV
//! export show the same series as an underwater curve (`nav / peak - 1`),
//! which is simply its negation.

/// Peak-relative drawdown magnitude at every index
pub fn drawdown_series(nav: &[f64]) -> Vec<f64> {
    let mut peak = f64::NEG_INFINITY;
    nav.iter()
        .map(|&value| {
            if value > peak {
                peak = value;
            }
            if peak > 0.0 && value.is_finite() {
                (1.0 - value / peak).clamp(0.0, 1.0)
            } else {
                0.0
            }
        })
        .collect()
}

/// Largest drawdown magnitude, `0.0` for an empty series
pub fn max_drawdown(nav: &[f64]) -> f64 {
    drawdown_series(nav).into_iter().fold(0.0, f64::max)
}

/// Underwater rendering (non-positive) of a drawdown magnitude series
pub fn underwater(drawdown: &[f64]) -> Vec<f64> {
    drawdown
        .iter()
        .map(|d| if *d == 0.0 { 0.0 } else { -d.abs() })
        .collect()
}
