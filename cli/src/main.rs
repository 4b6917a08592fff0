use anyhow::{bail, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

use ag_simulator::{
    BacktestRequest, BacktestService, HttpBackend, Rebalance, RunOutcome, SimPhase, Simulator,
};

mod config;
mod report;

use config::Overrides;

#[derive(Parser, Debug)]
#[clap(name = "ag-simctl", about = "Equal-weight portfolio backtest with local fallback")]
struct Args {
    #[clap(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Comma-separated symbol pool, e.g. AAPL,MSFT,NVDA
    #[clap(short, long, value_delimiter = ',', required = true)]
    symbols: Vec<String>,

    /// Lookback in weeks (defaults to backtest.default_weeks)
    #[clap(short, long)]
    weeks: Option<u32>,

    /// Rebalance frequency requested from the service: daily, weekly, monthly
    #[clap(short, long)]
    rebalance: Option<Rebalance>,

    /// Benchmark symbol for the local fallback
    #[clap(short, long)]
    benchmark: Option<String>,

    /// Run without a benchmark
    #[clap(long)]
    no_benchmark: bool,

    /// Write the NAV/benchmark/drawdown table to this CSV file
    #[clap(long)]
    csv: Option<PathBuf>,

    /// Write the chart as a standalone SVG document
    #[clap(long)]
    svg: Option<PathBuf>,

    /// Skip the backtest service and run the local engine only
    #[clap(long)]
    local_only: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let overrides = Overrides {
        weeks: args.weeks,
        rebalance: args.rebalance,
        benchmark: args.benchmark.clone(),
        no_benchmark: args.no_benchmark,
    };
    let config = config::load(&args.config, &overrides)?;
    let canvas = config.chart.canvas()?;

    let backend = Arc::new(HttpBackend::new(&config)?);
    let service: Option<Arc<dyn BacktestService>> = if args.local_only {
        info!("Service disabled, running local engine only");
        None
    } else {
        Some(backend.clone())
    };

    let simulator = Simulator::new(service, backend, config.backtest.clone());

    let request = BacktestRequest::new(
        args.symbols.clone(),
        config.backtest.default_weeks,
        config.backtest.rebalance,
    );

    let state = match simulator.run(request).await {
        RunOutcome::Applied(state) => state,
        RunOutcome::Superseded { generation } => {
            bail!("backtest run {} was superseded", generation)
        }
    };

    let result = match (state.phase, state.result) {
        (SimPhase::Success | SimPhase::LocalFallback, Some(result)) => result,
        _ => {
            let message = state.error.unwrap_or_else(|| "backtest failed".to_string());
            error!("{}", message);
            bail!(message);
        }
    };

    info!("{}", report::summary(state.phase, &result));

    if let Some(path) = &args.csv {
        report::write_csv_file(path, &result)?;
    }

    if let Some(path) = &args.svg {
        report::write_svg_file(path, &result, &canvas)?;
    }

    Ok(())
}
