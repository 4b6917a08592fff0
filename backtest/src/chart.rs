//! Chart coordinate mapping
//!
//! Turns a numeric series into SVG path commands over a fixed pixel canvas.
//! Indices map linearly onto `[P, W-P]`, values onto `[P, H-P]` with the y
//! axis inverted so larger values sit higher on screen.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::error::{BacktestError, Result};

/// Fixed-size drawing area with uniform padding
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChartCanvas {
    width: f64,
    height: f64,
    padding: f64,
}

impl Default for ChartCanvas {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 320.0,
            padding: 24.0,
        }
    }
}

/// Where an area chart closes its fill region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Baseline {
    /// y coordinate of value 0, clamped into the canvas
    Zero,
    /// y coordinate of the series minimum
    Min,
}

/// Value range of the finite entries of a series
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    pub min: f64,
    pub max: f64,
}

impl Extent {
    /// Extent of the finite values, `None` when there are none
    pub fn of(values: &[f64]) -> Option<Self> {
        values
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(None, |acc: Option<Extent>, v| {
                Some(match acc {
                    Some(e) => Extent {
                        min: e.min.min(v),
                        max: e.max.max(v),
                    },
                    None => Extent { min: v, max: v },
                })
            })
    }

    /// Extent covering both
    pub fn union(self, other: Extent) -> Self {
        Extent {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }
}

impl ChartCanvas {
    /// Create a canvas, rejecting sizes that leave no room inside the padding
    pub fn new(width: f64, height: f64, padding: f64) -> Result<Self> {
        let valid = width.is_finite()
            && height.is_finite()
            && padding.is_finite()
            && padding >= 0.0
            && width > 2.0 * padding
            && height > 2.0 * padding;

        if !valid {
            return Err(BacktestError::InvalidCanvas {
                width,
                height,
                padding,
            });
        }

        Ok(Self {
            width,
            height,
            padding,
        })
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn padding(&self) -> f64 {
        self.padding
    }

    fn inner_width(&self) -> f64 {
        self.width - 2.0 * self.padding
    }

    fn inner_height(&self) -> f64 {
        self.height - 2.0 * self.padding
    }

    /// x coordinate of index `i` in a series of `len` points
    pub fn x(&self, i: usize, len: usize) -> f64 {
        let denom = len.saturating_sub(1).max(1) as f64;
        self.padding + self.inner_width() * (i as f64 / denom)
    }

    /// y coordinate of `value` within `extent`
    ///
    /// A flat extent maps every value onto the vertical centre.
    pub fn y(&self, value: f64, extent: Extent) -> f64 {
        let span = extent.span();
        if span <= 0.0 || !span.is_finite() {
            return self.padding + self.inner_height() / 2.0;
        }
        let norm = (value - extent.min) / span;
        self.padding + (1.0 - norm) * self.inner_height()
    }

    /// Screen points of the finite values, keyed by source index
    pub fn points(&self, values: &[f64], extent: Extent) -> Vec<(usize, f64, f64)> {
        values
            .iter()
            .enumerate()
            .filter(|(_, v)| v.is_finite())
            .map(|(i, &v)| (i, self.x(i, values.len()), self.y(v, extent)))
            .collect()
    }

    /// SVG line path for `values`, scaled to their own extent
    pub fn line_path(&self, values: &[f64]) -> String {
        match Extent::of(values) {
            Some(extent) => self.line_path_in(values, extent),
            None => String::new(),
        }
    }

    /// SVG line path for `values` scaled to a shared `extent`
    ///
    /// Non-finite values emit nothing; the next finite value opens a new
    /// sub-path.
    pub fn line_path_in(&self, values: &[f64], extent: Extent) -> String {
        segments(&self.points(values, extent))
            .iter()
            .map(|segment| subpath(segment))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Closed SVG area path for `values`
    ///
    /// Each sub-path is closed down to the baseline to form a fillable region.
    pub fn area_path(&self, values: &[f64], baseline: Baseline) -> String {
        let Some(extent) = Extent::of(values) else {
            return String::new();
        };

        let base_y = match baseline {
            Baseline::Zero => self
                .y(0.0, extent)
                .clamp(self.padding, self.height - self.padding),
            Baseline::Min => self.y(extent.min, extent),
        };

        segments(&self.points(values, extent))
            .iter()
            .map(|segment| {
                let mut path = subpath(segment);
                if let (Some(first), Some(last)) = (segment.first(), segment.last()) {
                    let _ = write!(
                        path,
                        " L{:.2},{:.2} L{:.2},{:.2} Z",
                        last.1, base_y, first.1, base_y
                    );
                }
                path
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Split points into runs of consecutive source indices
fn segments(points: &[(usize, f64, f64)]) -> Vec<&[(usize, f64, f64)]> {
    let mut out = Vec::new();
    let mut start = 0;
    for i in 1..=points.len() {
        let breaks = i == points.len() || points[i].0 != points[i - 1].0 + 1;
        if breaks {
            if start < i {
                out.push(&points[start..i]);
            }
            start = i;
        }
    }
    out
}

fn subpath(segment: &[(usize, f64, f64)]) -> String {
    let mut path = String::new();
    for (n, (_, x, y)) in segment.iter().enumerate() {
        if n > 0 {
            path.push(' ');
        }
        let cmd = if n == 0 { 'M' } else { 'L' };
        let _ = write!(path, "{}{:.2},{:.2}", cmd, x, y);
    }
    path
}

/// Parse the coordinates out of an `M`/`L` path string
///
/// Closing commands are ignored.
pub fn path_points(path: &str) -> Vec<(f64, f64)> {
    path.split_whitespace()
        .filter_map(|token| {
            let coords = token.strip_prefix('M').or_else(|| token.strip_prefix('L'))?;
            let (x, y) = coords.split_once(',')?;
            Some((x.parse().ok()?, y.parse().ok()?))
        })
        .collect()
}
