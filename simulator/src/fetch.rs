//! Concurrent price fetches
//!
//! One request per symbol is issued at once and the batch completes only when
//! every request has settled, so alignment always sees the whole pool.

use futures_util::future::join_all;
use tracing::warn;

use ag_backtest::{PricePoint, SymbolSeries};

use crate::error::SimError;
use crate::provider::PriceSeriesProvider;

/// Settled results of a fan-out fetch
#[derive(Debug, Default)]
pub struct FetchBatch {
    /// Successfully fetched histories, in request order
    pub series: Vec<SymbolSeries>,

    /// Symbols whose fetch failed, with the error
    pub failed: Vec<(String, SimError)>,
}

impl FetchBatch {
    /// Every requested symbol failed
    pub fn all_failed(&self) -> bool {
        self.series.is_empty() && !self.failed.is_empty()
    }

    pub fn failed_symbols(&self) -> Vec<&str> {
        self.failed.iter().map(|(s, _)| s.as_str()).collect()
    }
}

/// Fetch every symbol concurrently and wait for all of them
pub async fn fetch_all(
    provider: &dyn PriceSeriesProvider,
    symbols: &[String],
    limit: usize,
) -> FetchBatch {
    let results = join_all(symbols.iter().map(|symbol| async move {
        let outcome = provider.fetch_prices(symbol, limit).await;
        (symbol.clone(), outcome)
    }))
    .await;

    let mut batch = FetchBatch::default();
    for (symbol, outcome) in results {
        match outcome {
            Ok(points) => batch.series.push(SymbolSeries::new(symbol, points)),
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "Price fetch failed");
                batch.failed.push((symbol, e));
            }
        }
    }
    batch
}

/// Fetch the benchmark, turning any failure into `None`
pub async fn fetch_benchmark(
    provider: &dyn PriceSeriesProvider,
    symbol: Option<&str>,
    limit: usize,
) -> Option<Vec<PricePoint>> {
    let symbol = symbol?;
    match provider.fetch_prices(symbol, limit).await {
        Ok(points) => Some(points),
        Err(e) => {
            warn!(symbol = %symbol, error = %e, "Benchmark fetch failed, continuing without it");
            None
        }
    }
}
