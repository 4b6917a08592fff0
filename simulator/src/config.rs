use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use ag_backtest::{ChartCanvas, EngineConfig, MIN_SERIES_POINTS, TRADING_DAYS_PER_YEAR};

use crate::error::{SimError, SimResult};
use crate::provider::Rebalance;

/// Environment variable overriding `service.base_url`
pub const BASE_URL_ENV: &str = "AG_SIM_BASE_URL";

/// Simulator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatorConfig {
    /// Backend service endpoints
    pub service: ServiceConfig,

    /// Backtest defaults and local engine settings
    #[serde(default)]
    pub backtest: BacktestSettings,

    /// Chart canvas
    #[serde(default)]
    pub chart: ChartConfig,
}

/// Backend service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Base URL, e.g. `http://localhost:8000`
    pub base_url: String,

    /// Price series endpoint path
    #[serde(default = "default_prices_path")]
    pub prices_path: String,

    /// Backtest endpoint path
    #[serde(default = "default_backtest_path")]
    pub backtest_path: String,

    /// TCP connect timeout in seconds; requests themselves are not timed out
    #[serde(default = "default_connect_timeout_sec")]
    pub connect_timeout_sec: u64,
}

impl ServiceConfig {
    /// Get connect timeout as Duration
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_sec)
    }
}

/// Backtest settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestSettings {
    /// Minimum bars a symbol needs in the local fallback
    #[serde(default = "default_min_points")]
    pub min_points: usize,

    /// Trading days per year for annualization
    #[serde(default = "default_trading_days")]
    pub trading_days: u32,

    /// Benchmark symbol fetched for the local fallback
    #[serde(default = "default_benchmark_symbol")]
    pub benchmark_symbol: Option<String>,

    /// Default lookback in weeks
    #[serde(default = "default_weeks")]
    pub default_weeks: u32,

    /// Default rebalance frequency requested from the service
    #[serde(default)]
    pub rebalance: Rebalance,

    /// Extra bars requested on top of the lookback window
    #[serde(default = "default_lookback_padding")]
    pub lookback_padding: usize,
}

impl BacktestSettings {
    /// Local engine configuration
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            min_points: self.min_points,
            trading_days: self.trading_days,
        }
    }

    /// Number of daily bars to request for a lookback of `weeks`
    ///
    /// Never below `min_points`, otherwise every symbol would be excluded.
    pub fn price_limit(&self, weeks: u32) -> usize {
        (weeks as usize * 5 + self.lookback_padding).max(self.min_points)
    }
}

impl Default for BacktestSettings {
    fn default() -> Self {
        Self {
            min_points: default_min_points(),
            trading_days: default_trading_days(),
            benchmark_symbol: default_benchmark_symbol(),
            default_weeks: default_weeks(),
            rebalance: Rebalance::default(),
            lookback_padding: default_lookback_padding(),
        }
    }
}

/// Chart canvas configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartConfig {
    #[serde(default = "default_chart_width")]
    pub width: f64,

    #[serde(default = "default_chart_height")]
    pub height: f64,

    #[serde(default = "default_chart_padding")]
    pub padding: f64,
}

impl ChartConfig {
    /// Build the validated canvas
    pub fn canvas(&self) -> SimResult<ChartCanvas> {
        Ok(ChartCanvas::new(self.width, self.height, self.padding)?)
    }
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            width: default_chart_width(),
            height: default_chart_height(),
            padding: default_chart_padding(),
        }
    }
}

// Default value functions
fn default_prices_path() -> String {
    "/api/prices".to_string()
}

fn default_backtest_path() -> String {
    "/api/backtest".to_string()
}

fn default_connect_timeout_sec() -> u64 {
    10
}

fn default_min_points() -> usize {
    MIN_SERIES_POINTS
}

fn default_trading_days() -> u32 {
    TRADING_DAYS_PER_YEAR
}

fn default_benchmark_symbol() -> Option<String> {
    Some("SPY".to_string())
}

fn default_weeks() -> u32 {
    52
}

fn default_lookback_padding() -> usize {
    5
}

fn default_chart_width() -> f64 {
    800.0
}

fn default_chart_height() -> f64 {
    320.0
}

fn default_chart_padding() -> f64 {
    24.0
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                base_url: "http://localhost:8000".to_string(),
                prices_path: default_prices_path(),
                backtest_path: default_backtest_path(),
                connect_timeout_sec: default_connect_timeout_sec(),
            },
            backtest: BacktestSettings::default(),
            chart: ChartConfig::default(),
        }
    }
}

impl SimulatorConfig {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> SimResult<Self> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| SimError::ConfigError(format!("{}: {}", path.as_ref().display(), e)))?;

        Self::from_yaml(&contents)
    }

    /// Load configuration from YAML string
    pub fn from_yaml(yaml: &str) -> SimResult<Self> {
        let config: SimulatorConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to YAML file
    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> SimResult<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Replace the base URL from the environment when set
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var(BASE_URL_ENV) {
            if !url.trim().is_empty() {
                self.service.base_url = url.trim().to_string();
            }
        }
        self
    }

    /// Check values that serde cannot
    pub fn validate(&self) -> SimResult<()> {
        url::Url::parse(&self.service.base_url)
            .map_err(|e| SimError::ConfigError(format!("invalid base_url: {}", e)))?;

        if self.backtest.trading_days == 0 {
            return Err(SimError::ConfigError(
                "trading_days must be positive".to_string(),
            ));
        }

        self.chart.canvas()?;
        Ok(())
    }
}
