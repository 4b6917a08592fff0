//! Backtest simulator orchestrating the service call and the local fallback
//!
//! Phases: `Idle -> Loading -> {Success, LocalFallback, Error}`. A failing or
//! empty service answer switches to the local equal-weight engine; only a
//! failing fallback surfaces an error. Each run is tagged with a generation
//! and a run that has been superseded when it resolves leaves the published
//! state untouched.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use ag_backtest::{BacktestResult, EqualWeightEngine};

use crate::config::BacktestSettings;
use crate::error::{SimError, SimResult};
use crate::fetch::{fetch_all, fetch_benchmark};
use crate::provider::{BacktestRequest, BacktestService, PriceSeriesProvider};

/// Simulator view phase
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SimPhase {
    #[default]
    Idle,
    Loading,
    Success,
    LocalFallback,
    Error,
}

impl SimPhase {
    /// Whether the phase ends a run
    pub fn is_terminal(&self) -> bool {
        matches!(self, SimPhase::Success | SimPhase::LocalFallback | SimPhase::Error)
    }
}

/// Published simulator state
#[derive(Debug, Clone, Default)]
pub struct SimulatorState {
    /// Generation of the run that produced this state
    pub generation: u64,

    pub phase: SimPhase,

    /// Result to chart, present in `Success` and `LocalFallback`
    pub result: Option<Arc<BacktestResult>>,

    /// User-facing message, present in `Error`
    pub error: Option<String>,
}

/// What happened to a run
#[derive(Debug, Clone)]
pub enum RunOutcome {
    /// The run finished and its state was published
    Applied(SimulatorState),

    /// A newer run (or a teardown) took over; nothing was published
    Superseded { generation: u64 },
}

impl RunOutcome {
    pub fn state(&self) -> Option<&SimulatorState> {
        match self {
            RunOutcome::Applied(state) => Some(state),
            RunOutcome::Superseded { .. } => None,
        }
    }

    pub fn is_superseded(&self) -> bool {
        matches!(self, RunOutcome::Superseded { .. })
    }
}

/// Backtest simulator
pub struct Simulator {
    /// Primary backtest service; `None` runs the local engine directly
    service: Option<Arc<dyn BacktestService>>,

    /// Raw price history source for the fallback
    provider: Arc<dyn PriceSeriesProvider>,

    engine: EqualWeightEngine,

    settings: BacktestSettings,

    /// Latest issued generation
    generation: AtomicU64,

    state: watch::Sender<SimulatorState>,
}

impl Simulator {
    /// Create a new simulator
    pub fn new(
        service: Option<Arc<dyn BacktestService>>,
        provider: Arc<dyn PriceSeriesProvider>,
        settings: BacktestSettings,
    ) -> Self {
        let (state, _) = watch::channel(SimulatorState::default());
        Self {
            service,
            provider,
            engine: EqualWeightEngine::new(settings.engine_config()),
            settings,
            generation: AtomicU64::new(0),
            state,
        }
    }

    /// Current state snapshot
    pub fn state(&self) -> SimulatorState {
        self.state.borrow().clone()
    }

    /// Receive every published state change
    pub fn subscribe(&self) -> watch::Receiver<SimulatorState> {
        self.state.subscribe()
    }

    pub fn settings(&self) -> &BacktestSettings {
        &self.settings
    }

    /// Latest issued generation
    pub fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    fn is_current(&self, generation: u64) -> bool {
        self.current_generation() == generation
    }

    /// Invalidate any in-flight run, e.g. when the view is torn down
    ///
    /// Returns the new generation.
    pub fn invalidate(&self) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(generation, "Simulator invalidated");
        generation
    }

    /// Publish `next` only if `generation` is still the latest
    fn publish(&self, generation: u64, next: SimulatorState) -> bool {
        self.state.send_if_modified(|state| {
            if self.is_current(generation) && state.generation <= generation {
                *state = next;
                true
            } else {
                false
            }
        })
    }

    fn superseded(&self, generation: u64) -> RunOutcome {
        debug!(
            generation,
            current = self.current_generation(),
            "Discarding superseded backtest run"
        );
        RunOutcome::Superseded { generation }
    }

    fn finish(&self, generation: u64, next: SimulatorState) -> RunOutcome {
        if self.publish(generation, next.clone()) {
            RunOutcome::Applied(next)
        } else {
            self.superseded(generation)
        }
    }

    /// Run a backtest, falling back to the local engine when needed
    ///
    /// No retries are scheduled; the caller re-triggers after an error.
    pub async fn run(&self, request: BacktestRequest) -> RunOutcome {
        let generation = self.invalidate();
        let request = BacktestRequest {
            symbols: request.normalized_symbols(),
            ..request
        };

        info!(
            generation,
            symbols = ?request.symbols,
            weeks = request.weeks,
            "Starting backtest"
        );

        self.publish(
            generation,
            SimulatorState {
                generation,
                phase: SimPhase::Loading,
                result: None,
                error: None,
            },
        );

        if request.symbols.is_empty() {
            return self.finish(
                generation,
                error_state(generation, "Select at least one symbol"),
            );
        }

        if let Some(service) = &self.service {
            match service.run_backtest(&request).await {
                Ok(result) if !result.is_empty() => {
                    info!(generation, dates = result.len(), "Service backtest succeeded");
                    return self.finish(
                        generation,
                        result_state(generation, SimPhase::Success, result),
                    );
                }
                Ok(_) => {
                    warn!(generation, "Service returned no usable NAV, using local engine");
                }
                Err(e) => {
                    warn!(generation, error = %e, "Service backtest failed, using local engine");
                }
            }

            if !self.is_current(generation) {
                return self.superseded(generation);
            }
        }

        // stays Loading until the fallback has a result to show
        let outcome = self.run_local(&request).await;

        if !self.is_current(generation) {
            return self.superseded(generation);
        }

        match outcome {
            Ok(result) => {
                info!(
                    generation,
                    dates = result.len(),
                    benchmark = result.has_benchmark(),
                    "Local backtest complete"
                );
                self.finish(
                    generation,
                    result_state(generation, SimPhase::LocalFallback, result),
                )
            }
            Err(e) => {
                error!(generation, error = %e, "Local backtest failed");
                self.finish(generation, error_state(generation, &e.to_string()))
            }
        }
    }

    /// Local equal-weight backtest over the raw price provider
    ///
    /// Fails only when nothing chartable can be produced.
    pub async fn run_local(&self, request: &BacktestRequest) -> SimResult<BacktestResult> {
        let limit = self.settings.price_limit(request.weeks);

        let (batch, benchmark) = tokio::join!(
            fetch_all(self.provider.as_ref(), &request.symbols, limit),
            fetch_benchmark(
                self.provider.as_ref(),
                self.settings.benchmark_symbol.as_deref(),
                limit,
            ),
        );

        if batch.all_failed() {
            return Err(SimError::FallbackFailed(format!(
                "could not load prices for {}",
                batch.failed_symbols().join(", ")
            )));
        }

        let result = self
            .engine
            .run_with_benchmark(&batch.series, benchmark.as_deref());

        if result.is_empty() {
            return Err(SimError::FallbackFailed(format!(
                "no common price history with at least {} days",
                self.settings.min_points
            )));
        }

        Ok(result)
    }
}

fn result_state(generation: u64, phase: SimPhase, result: BacktestResult) -> SimulatorState {
    SimulatorState {
        generation,
        phase,
        result: Some(Arc::new(result)),
        error: None,
    }
}

fn error_state(generation: u64, message: &str) -> SimulatorState {
    SimulatorState {
        generation,
        phase: SimPhase::Error,
        result: None,
        error: Some(message.to_string()),
    }
}
