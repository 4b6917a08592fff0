use anyhow::Result;
use std::path::Path;
use tracing::{info, warn};

use ag_simulator::{Rebalance, SimulatorConfig, BASE_URL_ENV};

/// Command-line overrides applied on top of the YAML file
#[derive(Debug, Default)]
pub struct Overrides {
    pub weeks: Option<u32>,
    pub rebalance: Option<Rebalance>,
    pub benchmark: Option<String>,
    pub no_benchmark: bool,
}

/// Load configuration: YAML file (or defaults), then `.env`, then flags
pub fn load(path: &Path, overrides: &Overrides) -> Result<SimulatorConfig> {
    dotenv::dotenv().ok();

    let config = if path.exists() {
        info!("Loading configuration from {:?}", path);
        SimulatorConfig::from_yaml_file(path)?
    } else {
        warn!("Config file {:?} not found, using defaults", path);
        SimulatorConfig::default()
    };

    let mut config = config.with_env_overrides();
    apply(&mut config, overrides);
    config.validate()?;

    info!(
        base_url = %config.service.base_url,
        from_env = std::env::var(BASE_URL_ENV).is_ok(),
        "Service endpoint"
    );

    Ok(config)
}

fn apply(config: &mut SimulatorConfig, overrides: &Overrides) {
    if let Some(weeks) = overrides.weeks {
        config.backtest.default_weeks = weeks;
    }
    if let Some(rebalance) = overrides.rebalance {
        config.backtest.rebalance = rebalance;
    }
    if let Some(symbol) = &overrides.benchmark {
        config.backtest.benchmark_symbol = Some(symbol.trim().to_ascii_uppercase());
    }
    if overrides.no_benchmark {
        config.backtest.benchmark_symbol = None;
    }
}
