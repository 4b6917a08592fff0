//! Integration tests for HttpBackend against a mock server

use std::sync::Arc;

use ag_simulator::{
    BacktestRequest, BacktestService, HttpBackend, PriceSeriesProvider, Rebalance, SimError,
    SimPhase, Simulator, SimulatorConfig,
};
use approx::assert_relative_eq;
use chrono::{Duration, NaiveDate};
use serde_json::{json, Value};
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> SimulatorConfig {
    let mut config = SimulatorConfig::default();
    config.service.base_url = server.uri();
    config
}

fn bars(days: usize, start: f64, step: f64) -> Value {
    let first = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
    let rows: Vec<Value> = (0..days)
        .map(|i| {
            let close = start + step * i as f64;
            json!({
                "date": (first + Duration::days(i as i64)).format("%Y-%m-%d").to_string(),
                "open": close,
                "high": close,
                "low": close,
                "close": close,
                "volume": 1000
            })
        })
        .collect();
    Value::Array(rows)
}

#[tokio::test]
async fn test_fetch_prices_bare_array() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/prices"))
        .and(query_param("symbol", "AAPL"))
        .and(query_param("limit", "265"))
        .respond_with(ResponseTemplate::new(200).set_body_json(bars(3, 10.0, 1.0)))
        .expect(1)
        .mount(&server)
        .await;

    let backend = HttpBackend::new(&config_for(&server)).unwrap();
    let points = backend.fetch_prices("AAPL", 265).await.unwrap();

    assert_eq!(points.len(), 3);
    assert_eq!(points[0].date, "2024-03-01");
    assert_relative_eq!(points[2].close, 12.0);
    assert_eq!(points[0].volume, Some(1000.0));
}

#[tokio::test]
async fn test_fetch_prices_wrapped_payload() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/prices"))
        .and(query_param("symbol", "MSFT"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "data": bars(2, 300.0, -1.0) })),
        )
        .mount(&server)
        .await;

    let backend = HttpBackend::new(&config_for(&server)).unwrap();
    let points = backend.fetch_prices("MSFT", 10).await.unwrap();

    assert_eq!(points.len(), 2);
    assert_relative_eq!(points[1].close, 299.0);
}

#[tokio::test]
async fn test_fetch_prices_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/prices"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
        .mount(&server)
        .await;

    let backend = HttpBackend::new(&config_for(&server)).unwrap();
    let err = backend.fetch_prices("AAPL", 10).await.unwrap_err();

    match err {
        SimError::ServiceError {
            endpoint,
            status,
            message,
        } => {
            assert_eq!(endpoint, "/api/prices");
            assert_eq!(status, 500);
            assert_eq!(message, "upstream down");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_fetch_prices_malformed_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/prices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "rows": [] })))
        .mount(&server)
        .await;

    let backend = HttpBackend::new(&config_for(&server)).unwrap();
    let err = backend.fetch_prices("AAPL", 10).await.unwrap_err();

    assert!(matches!(err, SimError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_run_backtest_normalizes_payload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/backtest"))
        .and(body_json(json!({
            "symbols": ["AAPL", "MSFT"],
            "weeks": 26,
            "rebalance": "monthly"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "date": ["2024-03-01", "2024-03-04", "2024-03-05"],
            "equity": [200.0, 220.0, 198.0],
            "benchmark": [10.0, 10.5, 11.0],
            "metrics": { "annReturn": 0.12, "maxDD": -0.1, "sharpeRatio": 0.8 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let backend = HttpBackend::new(&config_for(&server)).unwrap();
    let request = BacktestRequest::new(
        vec!["AAPL".to_string(), "MSFT".to_string()],
        26,
        Rebalance::Monthly,
    );
    let result = backend.run_backtest(&request).await.unwrap();

    assert_eq!(result.dates[1].as_str(), "20240304");
    assert_relative_eq!(result.nav[0], 1.0);
    assert_relative_eq!(result.nav[2], 0.99, epsilon = 1e-12);
    assert_relative_eq!(result.benchmark_nav[2], 1.1, epsilon = 1e-12);
    assert_eq!(result.metrics.ann_return, Some(0.12));
    assert_eq!(result.metrics.mdd, Some(0.1));
    assert_eq!(result.metrics.sharpe, Some(0.8));
}

#[tokio::test]
async fn test_run_backtest_with_null_nav_is_empty() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/backtest"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "dates": ["2024-03-01", "2024-03-04"],
            "nav": [1.0, null]
        })))
        .mount(&server)
        .await;

    let backend = HttpBackend::new(&config_for(&server)).unwrap();
    let request = BacktestRequest::new(vec!["AAPL".to_string()], 52, Rebalance::Weekly);
    let result = backend.run_backtest(&request).await.unwrap();

    assert!(result.is_empty());
}

#[tokio::test]
async fn test_simulator_falls_back_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/backtest"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;
    for (symbol, start, step) in [("AAPL", 100.0, 1.0), ("MSFT", 50.0, 0.5), ("SPY", 400.0, 1.0)] {
        Mock::given(method("GET"))
            .and(path("/api/prices"))
            .and(query_param("symbol", symbol))
            .respond_with(ResponseTemplate::new(200).set_body_json(bars(80, start, step)))
            .expect(1)
            .mount(&server)
            .await;
    }

    let config = config_for(&server);
    let backend = Arc::new(HttpBackend::new(&config).unwrap());
    let service: Arc<dyn BacktestService> = backend.clone();
    let simulator = Simulator::new(Some(service), backend, config.backtest.clone());

    let request = BacktestRequest::new(
        vec!["aapl".to_string(), "MSFT".to_string()],
        52,
        Rebalance::Weekly,
    );
    let state = simulator.run(request).await.state().cloned().unwrap();

    assert_eq!(state.phase, SimPhase::LocalFallback);
    let result = state.result.unwrap();
    assert_eq!(result.len(), 80);
    assert!(result.has_benchmark());
    // both legs gain 79% over the window, so the blend does too
    assert_relative_eq!(result.final_nav().unwrap(), 1.79, epsilon = 1e-9);
}
