//! HTTP backend for the price-series and backtest endpoints

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use tracing::debug;
use url::Url;

use ag_backtest::{BacktestResult, PricePoint, ServiceBacktestResponse};

use crate::config::SimulatorConfig;
use crate::error::{SimError, SimResult};
use crate::provider::{BacktestRequest, BacktestService, PriceSeriesProvider};

/// Price payload: a bare array or wrapped under `data`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PricesPayload {
    Bare(Vec<PricePoint>),
    Wrapped { data: Vec<PricePoint> },
}

impl PricesPayload {
    fn into_points(self) -> Vec<PricePoint> {
        match self {
            PricesPayload::Bare(points) | PricesPayload::Wrapped { data: points } => points,
        }
    }
}

/// HTTP client for the dashboard backend
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    prices_url: Url,
    backtest_url: Url,
    trading_days: u32,
}

impl HttpBackend {
    /// Create a new backend client from configuration
    pub fn new(config: &SimulatorConfig) -> SimResult<Self> {
        let client = Client::builder()
            .connect_timeout(config.service.connect_timeout())
            .build()
            .map_err(|e| SimError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        let base = Url::parse(&config.service.base_url)?;

        Ok(Self {
            client,
            prices_url: base.join(&config.service.prices_path)?,
            backtest_url: base.join(&config.service.backtest_path)?,
            trading_days: config.backtest.trading_days,
        })
    }

    /// Turn a non-success response into a service error
    async fn check(response: Response) -> SimResult<Response> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let endpoint = response.url().path().to_string();
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        Err(SimError::ServiceError {
            endpoint,
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl PriceSeriesProvider for HttpBackend {
    async fn fetch_prices(&self, symbol: &str, limit: usize) -> SimResult<Vec<PricePoint>> {
        let mut url = self.prices_url.clone();
        url.query_pairs_mut()
            .append_pair("symbol", symbol)
            .append_pair("limit", &limit.to_string());

        debug!(symbol = %symbol, limit, "Fetching price series");

        let response = self.client.get(url).send().await?;
        let body = Self::check(response).await?.text().await?;

        let payload: PricesPayload = serde_json::from_str(&body)
            .map_err(|e| SimError::InvalidResponse(format!("price series for {}: {}", symbol, e)))?;

        Ok(payload.into_points())
    }
}

#[async_trait]
impl BacktestService for HttpBackend {
    async fn run_backtest(&self, request: &BacktestRequest) -> SimResult<BacktestResult> {
        debug!(
            symbols = ?request.symbols,
            weeks = request.weeks,
            rebalance = %request.rebalance,
            "Requesting service backtest"
        );

        let response = self
            .client
            .post(self.backtest_url.clone())
            .json(request)
            .send()
            .await?;
        let body = Self::check(response).await?.text().await?;

        let raw = ServiceBacktestResponse::from_json(&body)
            .map_err(|e| SimError::InvalidResponse(format!("backtest: {}", e)))?;

        Ok(raw.into_result(self.trading_days))
    }
}
