//! # ag-backtest: Equal-Weight Backtest and Chart Path Engine
//!
//! This library holds the numerical core of the dashboard simulator: the
//! local equal-weight backtest used when the backtest service is unavailable,
//! and the mapping of NAV/drawdown series into SVG paths.
//!
//! ## Core Components
//!
//! - **Date alignment**: `YYYYMMDD` date keys and the common-date intersection
//! - **EqualWeightEngine**: daily-rebalanced equal-weight NAV and returns
//! - **Benchmark normalization**: full-coverage check and rebasing to 1.0
//! - **PerformanceMetrics**: annualized return, max drawdown, Sharpe ratio
//! - **ChartCanvas**: index/value to screen mapping, line and area paths
//! - **Export**: CSV rows and a standalone SVG document
//! - **Service normalization**: folds service payloads into the canonical result
//!
//! ## Example Usage
//!
//! ```rust
//! use ag_backtest::{ChartCanvas, EngineConfig, EqualWeightEngine, PricePoint, SymbolSeries};
//!
//! let aapl = SymbolSeries::new("AAPL", vec![
//!     PricePoint::from_close("2024-01-02", 100.0),
//!     PricePoint::from_close("2024-01-03", 110.0),
//! ]);
//! let msft = SymbolSeries::new("MSFT", vec![
//!     PricePoint::from_close("2024-01-02", 50.0),
//!     PricePoint::from_close("2024-01-03", 45.0),
//! ]);
//!
//! let engine = EqualWeightEngine::new(EngineConfig { min_points: 2, ..Default::default() });
//! let result = engine.run(&[aapl, msft]);
//! assert_eq!(result.nav, vec![1.0, 1.0]);
//!
//! let canvas = ChartCanvas::new(100.0, 100.0, 10.0).unwrap();
//! let path = canvas.line_path(&result.nav);
//! assert!(path.starts_with('M'));
//! ```

pub mod align;
pub mod benchmark;
pub mod chart;
pub mod drawdown;
pub mod engine;
pub mod error;
pub mod export;
pub mod metrics;
pub mod normalize;
pub mod types;

pub use align::{align_series, AlignedSeries, MIN_SERIES_POINTS};
pub use benchmark::normalize_benchmark;
pub use chart::{path_points, Baseline, ChartCanvas, Extent};
pub use drawdown::{drawdown_series, max_drawdown, underwater};
pub use engine::{equal_weight_nav, EngineConfig, EqualWeightEngine, NavCurve};
pub use error::{BacktestError, Result};
pub use export::{render_svg, to_csv_string, write_csv};
pub use metrics::{compute_metrics, PerformanceMetrics, TRADING_DAYS_PER_YEAR};
pub use normalize::{ServiceBacktestResponse, ServiceMetrics};
pub use types::{BacktestMetrics, BacktestResult, DateKey, PricePoint, SymbolSeries};
