//! # ag-simulator: Backtest Simulator Orchestration
//!
//! This library drives a portfolio backtest for a symbol pool: it asks the
//! backtest service first and, when the service fails or answers with nothing
//! usable, fetches raw price history concurrently and runs the local
//! equal-weight engine from `ag-backtest`.
//!
//! ## Core Components
//!
//! - **Simulator**: phase machine `Idle -> Loading -> {Success, LocalFallback, Error}`
//!   with stale-run suppression
//! - **PriceSeriesProvider / BacktestService**: async traits for the two endpoints
//! - **HttpBackend**: reqwest implementation of both traits
//! - **fetch_all**: concurrent fan-out that waits for every symbol to settle
//! - **ChartMount**: chart bound to an injected render surface, PNG export
//! - **SimulatorConfig**: YAML configuration with environment overrides
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use ag_simulator::{
//!     BacktestRequest, BacktestService, HttpBackend, Rebalance, Simulator, SimulatorConfig,
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = SimulatorConfig::default().with_env_overrides();
//!     let backend = Arc::new(HttpBackend::new(&config).unwrap());
//!
//!     let service: Arc<dyn BacktestService> = backend.clone();
//!
//!     let simulator = Simulator::new(Some(service), backend, config.backtest.clone());
//!
//!     let request = BacktestRequest::new(
//!         vec!["AAPL".to_string(), "MSFT".to_string()],
//!         52,
//!         Rebalance::Weekly,
//!     );
//!
//!     if let Some(state) = simulator.run(request).await.state() {
//!         println!("{:?}: {:?}", state.phase, state.result.as_ref().map(|r| r.metrics));
//!     }
//! }
//! ```

pub mod config;
pub mod error;
pub mod fetch;
pub mod http;
pub mod provider;
pub mod simulator;
pub mod surface;

pub use config::{BacktestSettings, ChartConfig, ServiceConfig, SimulatorConfig, BASE_URL_ENV};
pub use error::{SimError, SimResult};
pub use fetch::{fetch_all, fetch_benchmark, FetchBatch};
pub use http::HttpBackend;
pub use provider::{BacktestRequest, BacktestService, PriceSeriesProvider, Rebalance};
pub use simulator::{RunOutcome, SimPhase, Simulator, SimulatorState};
pub use surface::{ChartMount, ListenerId, RenderSurface, ResizeListener};

// Initialize tracing
pub fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();
}
