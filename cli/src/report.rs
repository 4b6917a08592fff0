use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

use ag_backtest::{render_svg, write_csv, BacktestResult, ChartCanvas};
use ag_simulator::SimPhase;

fn pct(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.2}%", v * 100.0),
        None => "n/a".to_string(),
    }
}

fn ratio(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.2}", v),
        None => "n/a".to_string(),
    }
}

/// One-line summary of a finished run
pub fn summary(phase: SimPhase, result: &BacktestResult) -> String {
    let source = match phase {
        SimPhase::LocalFallback => "local",
        _ => "service",
    };
    let first = result.dates.first().map(|d| d.to_iso()).unwrap_or_default();
    let last = result.dates.last().map(|d| d.to_iso()).unwrap_or_default();

    format!(
        "[{}] {}..{} ({} days) total {} | ann {} | mdd {} | sharpe {}{}",
        source,
        first,
        last,
        result.len(),
        pct(result.total_return()),
        pct(result.metrics.ann_return),
        pct(result.metrics.mdd),
        ratio(result.metrics.sharpe),
        if result.has_benchmark() { " | benchmark" } else { "" },
    )
}

pub fn write_csv_file(path: &Path, result: &BacktestResult) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {:?}", path))?;
    let mut out = BufWriter::new(file);
    write_csv(result, &mut out)?;
    out.flush()?;

    info!("Wrote {} rows to {:?}", result.len(), path);
    Ok(())
}

pub fn write_svg_file(path: &Path, result: &BacktestResult, canvas: &ChartCanvas) -> Result<()> {
    std::fs::write(path, render_svg(result, canvas))
        .with_context(|| format!("writing {:?}", path))?;

    info!("Wrote chart to {:?}", path);
    Ok(())
}
