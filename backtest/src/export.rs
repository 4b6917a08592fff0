//! CSV and SVG export of a backtest result

use std::fmt::Write as _;
use std::io::Write;

use crate::chart::{Baseline, ChartCanvas, Extent};
use crate::drawdown::underwater;
use crate::error::Result;
use crate::types::BacktestResult;

/// CSV header row
pub const CSV_HEADER: [&str; 4] = ["date", "nav", "benchmark_nav", "drawdown"];

fn format_value(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => v.to_string(),
        _ => String::new(),
    }
}

/// Write `result` as CSV, one row per aligned date
///
/// The drawdown column is the underwater (non-positive) rendering, computed
/// from NAV when the result carries no drawdown series.
pub fn write_csv<W: Write>(result: &BacktestResult, out: W) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(out);

    wtr.write_record(CSV_HEADER)?;

    let drawdown = underwater(&result.drawdown_or_computed());

    for (i, date) in result.dates.iter().enumerate() {
        wtr.write_record([
            date.to_iso(),
            format_value(result.nav.get(i).copied()),
            format_value(result.benchmark_nav.get(i).copied()),
            format_value(drawdown.get(i).copied()),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// CSV export as a string
pub fn to_csv_string(result: &BacktestResult) -> Result<String> {
    let mut buf = Vec::new();
    write_csv(result, &mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Standalone SVG document with the NAV, benchmark and drawdown panels
///
/// NAV and benchmark share one extent so the lines are comparable; the
/// drawdown panel sits below as a filled underwater area.
pub fn render_svg(result: &BacktestResult, canvas: &ChartCanvas) -> String {
    let width = canvas.width();
    let height = canvas.height();
    let total_height = height * 2.0;

    let mut svg = String::new();
    let _ = write!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w:.0}" height="{h:.0}" viewBox="0 0 {w:.0} {h:.0}">"#,
        w = width,
        h = total_height
    );
    svg.push_str(r##"<rect width="100%" height="100%" fill="#ffffff"/>"##);

    let nav_extent = Extent::of(&result.nav);
    let extent = match (nav_extent, Extent::of(&result.benchmark_nav)) {
        (Some(a), Some(b)) => Some(a.union(b)),
        (a, b) => a.or(b),
    };

    if let Some(extent) = extent {
        if result.has_benchmark() {
            let _ = write!(
                svg,
                r##"<path class="benchmark" d="{}" fill="none" stroke="#fedd78" stroke-width="1.5"/>"##,
                canvas.line_path_in(&result.benchmark_nav, extent)
            );
        }
        let _ = write!(
            svg,
            r##"<path class="nav" d="{}" fill="none" stroke="#348dc1" stroke-width="1.5"/>"##,
            canvas.line_path_in(&result.nav, extent)
        );
    }

    let drawdown = underwater(&result.drawdown_or_computed());
    let area = canvas.area_path(&drawdown, Baseline::Zero);
    if !area.is_empty() {
        let _ = write!(
            svg,
            r##"<g transform="translate(0,{:.0})"><path class="drawdown" d="{}" fill="#af4b64" fill-opacity="0.35" stroke="#af4b64"/></g>"##,
            height, area
        );
    }

    svg.push_str("</svg>");
    svg
}
