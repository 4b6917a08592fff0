//! Integration tests for the Simulator phase machine

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use ag_backtest::{BacktestMetrics, BacktestResult, DateKey, PricePoint};
use ag_simulator::{
    BacktestRequest, BacktestService, BacktestSettings, PriceSeriesProvider, Rebalance,
    RunOutcome, SimError, SimPhase, SimResult, Simulator,
};
use approx::assert_relative_eq;
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, NaiveDate};

fn daily_closes(days: usize, start: f64, step: f64) -> Vec<PricePoint> {
    let first = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    (0..days)
        .map(|i| {
            let date = first + ChronoDuration::days(i as i64);
            PricePoint::from_close(
                date.format("%Y-%m-%d").to_string(),
                start + step * i as f64,
            )
        })
        .collect()
}

/// In-memory price provider, unknown symbols fail
#[derive(Default)]
struct MockPriceProvider {
    series: HashMap<String, Vec<PricePoint>>,
    calls: AtomicUsize,
}

impl MockPriceProvider {
    fn with(mut self, symbol: &str, points: Vec<PricePoint>) -> Self {
        self.series.insert(symbol.to_string(), points);
        self
    }
}

#[async_trait]
impl PriceSeriesProvider for MockPriceProvider {
    async fn fetch_prices(&self, symbol: &str, limit: usize) -> SimResult<Vec<PricePoint>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.series.get(symbol) {
            Some(points) => {
                let skip = points.len().saturating_sub(limit);
                Ok(points[skip..].to_vec())
            }
            None => Err(SimError::ServiceError {
                endpoint: "/api/prices".to_string(),
                status: 404,
                message: format!("unknown symbol {}", symbol),
            }),
        }
    }
}

/// Delays every fetch of the wrapped provider
struct SlowPriceProvider {
    inner: MockPriceProvider,
    delay: Duration,
}

#[async_trait]
impl PriceSeriesProvider for SlowPriceProvider {
    async fn fetch_prices(&self, symbol: &str, limit: usize) -> SimResult<Vec<PricePoint>> {
        tokio::time::sleep(self.delay).await;
        self.inner.fetch_prices(symbol, limit).await
    }
}

enum ServiceReply {
    Result(BacktestResult),
    Empty,
    Fail,
    Malformed,
}

/// Backtest service with a canned reply
///
/// Requests containing `SLOW` take noticeably longer to answer.
struct MockBacktestService {
    reply: ServiceReply,
}

#[async_trait]
impl BacktestService for MockBacktestService {
    async fn run_backtest(&self, request: &BacktestRequest) -> SimResult<BacktestResult> {
        let delay = if request.symbols.iter().any(|s| s == "SLOW") {
            120
        } else {
            5
        };
        tokio::time::sleep(Duration::from_millis(delay)).await;

        match &self.reply {
            ServiceReply::Result(result) => {
                let mut result = result.clone();
                // tag the answer with the pool size so tests can tell runs apart
                result.nav.truncate(request.symbols.len() + 1);
                result.dates.truncate(request.symbols.len() + 1);
                Ok(result)
            }
            ServiceReply::Empty => Ok(BacktestResult::empty()),
            ServiceReply::Fail => Err(SimError::ServiceError {
                endpoint: "/api/backtest".to_string(),
                status: 503,
                message: "maintenance".to_string(),
            }),
            ServiceReply::Malformed => {
                Err(SimError::InvalidResponse("backtest: expected value".to_string()))
            }
        }
    }
}

fn service_result() -> BacktestResult {
    BacktestResult {
        dates: (1..=5)
            .map(|d| DateKey::normalize(&format!("2024-02-0{}", d)))
            .collect(),
        nav: vec![1.0, 1.01, 1.02, 1.03, 1.04],
        benchmark_nav: Vec::new(),
        drawdown: Vec::new(),
        metrics: BacktestMetrics {
            ann_return: Some(0.5),
            mdd: Some(0.0),
            sharpe: Some(3.0),
        },
    }
}

fn service(reply: ServiceReply) -> Option<Arc<dyn BacktestService>> {
    let service: Arc<dyn BacktestService> = Arc::new(MockBacktestService { reply });
    Some(service)
}

fn standard_provider() -> MockPriceProvider {
    MockPriceProvider::default()
        .with("AAPL", daily_closes(70, 100.0, 1.0))
        .with("MSFT", daily_closes(70, 200.0, -0.5))
        .with("SPY", daily_closes(70, 400.0, 2.0))
}

fn request(symbols: &[&str]) -> BacktestRequest {
    BacktestRequest::new(
        symbols.iter().map(|s| s.to_string()).collect(),
        52,
        Rebalance::Weekly,
    )
}

fn applied(outcome: RunOutcome) -> ag_simulator::SimulatorState {
    match outcome {
        RunOutcome::Applied(state) => state,
        RunOutcome::Superseded { generation } => {
            panic!("run {} was unexpectedly superseded", generation)
        }
    }
}

#[tokio::test]
async fn test_service_success() {
    let simulator = Simulator::new(
        service(ServiceReply::Result(service_result())),
        Arc::new(standard_provider()),
        BacktestSettings::default(),
    );

    let state = applied(simulator.run(request(&["AAPL", "MSFT"])).await);

    assert_eq!(state.phase, SimPhase::Success);
    assert!(state.error.is_none());
    let result = state.result.unwrap();
    assert_eq!(result.nav, vec![1.0, 1.01, 1.02]);
    assert_eq!(result.metrics.sharpe, Some(3.0));
    assert_eq!(simulator.state().phase, SimPhase::Success);
}

#[tokio::test]
async fn test_service_failure_falls_back_to_local() {
    let provider = Arc::new(standard_provider());
    let simulator = Simulator::new(
        service(ServiceReply::Fail),
        provider.clone(),
        BacktestSettings::default(),
    );

    let state = applied(simulator.run(request(&["AAPL", "MSFT"])).await);

    assert_eq!(state.phase, SimPhase::LocalFallback);
    let result = state.result.unwrap();
    assert_eq!(result.len(), 70);
    assert_relative_eq!(result.nav[0], 1.0);
    assert!(result.has_benchmark());
    assert_relative_eq!(result.benchmark_nav[0], 1.0);
    assert_relative_eq!(result.benchmark_nav[69], 538.0 / 400.0, epsilon = 1e-12);
    assert!(result.metrics.ann_return.is_some());

    // two symbols plus the benchmark
    assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_empty_service_result_falls_back_to_local() {
    let simulator = Simulator::new(
        service(ServiceReply::Empty),
        Arc::new(standard_provider()),
        BacktestSettings::default(),
    );

    let state = applied(simulator.run(request(&["AAPL"])).await);

    assert_eq!(state.phase, SimPhase::LocalFallback);
    assert_eq!(state.result.unwrap().len(), 70);
}

#[tokio::test]
async fn test_local_only_without_service() {
    let simulator = Simulator::new(
        None,
        Arc::new(standard_provider()),
        BacktestSettings::default(),
    );

    let state = applied(simulator.run(request(&["MSFT"])).await);

    assert_eq!(state.phase, SimPhase::LocalFallback);
    let result = state.result.unwrap();
    assert_relative_eq!(
        result.final_nav().unwrap(),
        (200.0 - 0.5 * 69.0) / 200.0,
        epsilon = 1e-12
    );
}

#[tokio::test]
async fn test_all_fetches_failing_is_an_error() {
    let simulator = Simulator::new(
        service(ServiceReply::Fail),
        Arc::new(MockPriceProvider::default()),
        BacktestSettings::default(),
    );

    let state = applied(simulator.run(request(&["AAPL", "MSFT"])).await);

    assert_eq!(state.phase, SimPhase::Error);
    assert!(state.result.is_none());
    let message = state.error.unwrap();
    assert!(message.contains("AAPL"));
    assert!(message.contains("MSFT"));
}

#[tokio::test]
async fn test_no_common_history_is_an_error() {
    let provider = MockPriceProvider::default().with("AAPL", daily_closes(20, 100.0, 1.0));
    let simulator = Simulator::new(None, Arc::new(provider), BacktestSettings::default());

    let state = applied(simulator.run(request(&["AAPL"])).await);

    assert_eq!(state.phase, SimPhase::Error);
    assert!(state.error.is_some());
}

#[tokio::test]
async fn test_empty_symbol_pool_is_an_error() {
    let provider = Arc::new(standard_provider());
    let simulator = Simulator::new(
        service(ServiceReply::Result(service_result())),
        provider.clone(),
        BacktestSettings::default(),
    );

    let state = applied(simulator.run(request(&["  ", ""])).await);

    assert_eq!(state.phase, SimPhase::Error);
    assert_eq!(state.error.as_deref(), Some("Select at least one symbol"));
    assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_partial_benchmark_is_dropped() {
    let provider = MockPriceProvider::default()
        .with("AAPL", daily_closes(70, 100.0, 1.0))
        .with("SPY", daily_closes(50, 400.0, 2.0));
    let simulator = Simulator::new(None, Arc::new(provider), BacktestSettings::default());

    let state = applied(simulator.run(request(&["AAPL"])).await);

    assert_eq!(state.phase, SimPhase::LocalFallback);
    let result = state.result.unwrap();
    assert_eq!(result.len(), 70);
    assert!(result.benchmark_nav.is_empty());
}

#[tokio::test]
async fn test_missing_benchmark_does_not_fail_run() {
    let provider = MockPriceProvider::default().with("AAPL", daily_closes(70, 100.0, 1.0));
    let simulator = Simulator::new(None, Arc::new(provider), BacktestSettings::default());

    let state = applied(simulator.run(request(&["AAPL"])).await);

    assert_eq!(state.phase, SimPhase::LocalFallback);
    assert!(!state.result.unwrap().has_benchmark());
}

#[tokio::test]
async fn test_short_symbol_is_excluded() {
    let provider = standard_provider().with("TSLA", daily_closes(30, 250.0, 1.0));
    let simulator = Simulator::new(None, Arc::new(provider), BacktestSettings::default());

    let state = applied(simulator.run(request(&["AAPL", "TSLA"])).await);

    assert_eq!(state.phase, SimPhase::LocalFallback);
    let result = state.result.unwrap();
    // only AAPL remains, so the NAV tracks it alone
    assert_eq!(result.len(), 70);
    assert_relative_eq!(result.final_nav().unwrap(), 169.0 / 100.0, epsilon = 1e-12);
}

#[tokio::test]
async fn test_superseded_run_is_discarded() {
    let simulator = Simulator::new(
        service(ServiceReply::Result(service_result())),
        Arc::new(standard_provider()),
        BacktestSettings::default(),
    );

    let slow = simulator.run(request(&["SLOW", "AAPL", "MSFT"]));
    let fast = async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        simulator.run(request(&["AAPL"])).await
    };

    let (slow, fast) = tokio::join!(slow, fast);

    assert!(slow.is_superseded());
    let fast = applied(fast);
    assert_eq!(fast.phase, SimPhase::Success);

    let state = simulator.state();
    assert_eq!(state.generation, fast.generation);
    assert_eq!(state.result.unwrap().nav.len(), 2);
}

#[tokio::test]
async fn test_invalidate_discards_in_flight_run() {
    let simulator = Simulator::new(
        service(ServiceReply::Result(service_result())),
        Arc::new(standard_provider()),
        BacktestSettings::default(),
    );

    let run = simulator.run(request(&["SLOW"]));
    let teardown = async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        simulator.invalidate()
    };

    let (outcome, _) = tokio::join!(run, teardown);

    assert!(outcome.is_superseded());
    let state = simulator.state();
    assert_eq!(state.phase, SimPhase::Loading);
    assert!(state.result.is_none());
}

#[tokio::test]
async fn test_subscribers_see_terminal_state() {
    let simulator = Simulator::new(
        service(ServiceReply::Fail),
        Arc::new(standard_provider()),
        BacktestSettings::default(),
    );
    let mut rx = simulator.subscribe();
    assert_eq!(rx.borrow().phase, SimPhase::Idle);

    applied(simulator.run(request(&["AAPL"])).await);

    assert!(rx.has_changed().unwrap());
    let state = rx.borrow_and_update().clone();
    assert!(state.phase.is_terminal());
    assert_eq!(state.phase, SimPhase::LocalFallback);
}

#[tokio::test]
async fn test_first_terminal_state_carries_result() {
    let provider = SlowPriceProvider {
        inner: standard_provider(),
        delay: Duration::from_millis(100),
    };
    let simulator = Simulator::new(
        service(ServiceReply::Fail),
        Arc::new(provider),
        BacktestSettings::default(),
    );
    let mut rx = simulator.subscribe();

    let watcher = async {
        let state = rx.wait_for(|s| s.phase.is_terminal()).await.unwrap();
        state.clone()
    };
    let in_flight = async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        simulator.state()
    };

    let (first_terminal, during_fallback, outcome) =
        tokio::join!(watcher, in_flight, simulator.run(request(&["AAPL"])));

    assert_eq!(during_fallback.phase, SimPhase::Loading);
    assert!(during_fallback.result.is_none());

    assert_eq!(first_terminal.phase, SimPhase::LocalFallback);
    assert!(first_terminal.result.is_some());
    assert_eq!(applied(outcome).phase, SimPhase::LocalFallback);
}

#[tokio::test]
async fn test_failed_fallback_never_looks_finished_early() {
    let provider = SlowPriceProvider {
        inner: MockPriceProvider::default(),
        delay: Duration::from_millis(50),
    };
    let simulator = Simulator::new(
        service(ServiceReply::Fail),
        Arc::new(provider),
        BacktestSettings::default(),
    );
    let mut rx = simulator.subscribe();

    let watcher = async {
        let state = rx.wait_for(|s| s.phase.is_terminal()).await.unwrap();
        state.clone()
    };

    let (first_terminal, _) = tokio::join!(watcher, simulator.run(request(&["AAPL"])));

    assert_eq!(first_terminal.phase, SimPhase::Error);
    assert!(first_terminal.error.is_some());
}

#[tokio::test]
async fn test_malformed_service_response_falls_back() {
    let simulator = Simulator::new(
        service(ServiceReply::Malformed),
        Arc::new(standard_provider()),
        BacktestSettings::default(),
    );

    let state = applied(simulator.run(request(&["AAPL", "MSFT"])).await);

    assert_eq!(state.phase, SimPhase::LocalFallback);
    assert_eq!(state.result.unwrap().len(), 70);
}
