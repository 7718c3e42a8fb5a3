//! Actual vs. predicted sales chart.
//!
//! Draws observed sales as bars and the fitted curve as a line on top,
//! written to an SVG file.
//!
//! # Examples
//!
//! ```no_run
//! use u_diffusion::bass::{predict, Mode};
//! use u_diffusion::plot::{plot, PlotOptions};
//!
//! let t: Vec<f64> = (0..15).map(|i| i as f64).collect();
//! let actual = [30.0, 42.0, 55.0, 70.0, 82.0, 91.0, 95.0, 90.0, 80.0, 66.0, 52.0, 39.0, 28.0, 20.0, 13.0];
//! let predicted = predict(&t, 0.03, 0.38, 1000.0, Mode::Instantaneous);
//!
//! let options = PlotOptions::default().with_legends("Actual", "Bass fit");
//! plot("adoption.svg", &t, &actual, &predicted, &options).unwrap();
//! ```

use std::path::Path;

use plotters::prelude::*;
use tracing::debug;

use crate::error::{DiffusionError, Result};

/// Pixels per inch used to turn `figsize` into a canvas size.
const DPI: f64 = 100.0;

/// Width of the predicted-values line in pixels.
const LINE_WIDTH: u32 = 3;

/// Fraction of the gap between neighbouring time points a bar occupies.
const BAR_FILL: f64 = 0.8;

/// Chart appearance.
#[derive(Debug, Clone)]
pub struct PlotOptions {
    /// X axis label.
    pub xlabel: String,
    /// Y axis label.
    pub ylabel: String,
    /// Fill color of the actual-value bars.
    pub bar_color: RGBColor,
    /// Color of the predicted-value line.
    pub line_color: RGBColor,
    /// Canvas size in inches (width, height).
    pub figsize: (f64, f64),
    /// Legend entries for (actual, predicted). No legend when `None`.
    pub legends: Option<(String, String)>,
}

impl Default for PlotOptions {
    fn default() -> Self {
        Self {
            xlabel: "Time period".to_string(),
            ylabel: "Sales".to_string(),
            bar_color: RGBColor(0, 0, 139),
            line_color: RGBColor(255, 0, 0),
            figsize: (10.0, 8.0),
            legends: None,
        }
    }
}

impl PlotOptions {
    /// Sets both axis labels.
    pub fn with_labels(mut self, xlabel: impl Into<String>, ylabel: impl Into<String>) -> Self {
        self.xlabel = xlabel.into();
        self.ylabel = ylabel.into();
        self
    }

    /// Sets the bar and line colors.
    pub fn with_colors(mut self, bar_color: RGBColor, line_color: RGBColor) -> Self {
        self.bar_color = bar_color;
        self.line_color = line_color;
        self
    }

    /// Sets the canvas size in inches.
    pub fn with_figsize(mut self, width: f64, height: f64) -> Self {
        self.figsize = (width, height);
        self
    }

    /// Enables the legend with the given entries.
    pub fn with_legends(mut self, actual: impl Into<String>, predicted: impl Into<String>) -> Self {
        self.legends = Some((actual.into(), predicted.into()));
        self
    }

    /// Canvas size in pixels.
    fn pixel_size(&self) -> (u32, u32) {
        let (w, h) = self.figsize;
        (to_pixels(w), to_pixels(h))
    }
}

fn to_pixels(inches: f64) -> u32 {
    (inches * DPI).round().clamp(1.0, u32::MAX as f64) as u32
}

fn plot_error<E: std::fmt::Display>(err: E) -> DiffusionError {
    DiffusionError::Plot(err.to_string())
}

/// Renders actual values as bars and predicted values as a line into an
/// SVG file at `path`.
///
/// # Errors
///
/// - [`DiffusionError::LengthMismatch`] if the three series are not aligned
/// - [`DiffusionError::InsufficientData`] if the series are empty
/// - [`DiffusionError::InvalidData`] for non-finite values or a non-positive figure size
/// - [`DiffusionError::Plot`] if the backend fails (for example, an unwritable path)
pub fn plot(
    path: impl AsRef<Path>,
    time_axis: &[f64],
    actual_values: &[f64],
    predicted_values: &[f64],
    options: &PlotOptions,
) -> Result<()> {
    let n = time_axis.len();
    if actual_values.len() != n {
        return Err(DiffusionError::length_mismatch(
            "time_axis",
            n,
            "actual_values",
            actual_values.len(),
        ));
    }
    if predicted_values.len() != n {
        return Err(DiffusionError::length_mismatch(
            "time_axis",
            n,
            "predicted_values",
            predicted_values.len(),
        ));
    }
    if n == 0 {
        return Err(DiffusionError::InsufficientData {
            required: 1,
            actual: 0,
        });
    }
    if time_axis
        .iter()
        .chain(actual_values)
        .chain(predicted_values)
        .any(|v| !v.is_finite())
    {
        return Err(DiffusionError::InvalidData(
            "plot inputs must be finite".to_string(),
        ));
    }
    let (w, h) = options.figsize;
    if !(w.is_finite() && h.is_finite() && w > 0.0 && h > 0.0) {
        return Err(DiffusionError::InvalidData(format!(
            "figure size must be positive, got ({w}, {h})"
        )));
    }

    let half_bar = bar_width(time_axis) / 2.0;
    let (x_min, x_max) = bounds(time_axis.iter().copied());
    let x_range = (x_min - half_bar)..(x_max + half_bar);

    let (y_low, y_high) = bounds(actual_values.iter().chain(predicted_values).copied());
    let y_min = y_low.min(0.0);
    let y_max = y_high.max(0.0);
    let pad = if y_max > y_min { (y_max - y_min) * 0.05 } else { 1.0 };
    let y_range = (y_min - if y_min < 0.0 { pad } else { 0.0 })..(y_max + pad);

    let path = path.as_ref();
    let root = SVGBackend::new(path, options.pixel_size()).into_drawing_area();
    root.fill(&WHITE).map_err(plot_error)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(x_range, y_range)
        .map_err(plot_error)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc(options.xlabel.as_str())
        .y_desc(options.ylabel.as_str())
        .draw()
        .map_err(plot_error)?;

    let bar_color = options.bar_color;
    let line_color = options.line_color;

    let bars = chart
        .draw_series(time_axis.iter().zip(actual_values).map(|(&t, &v)| {
            Rectangle::new([(t - half_bar, 0.0), (t + half_bar, v)], bar_color.filled())
        }))
        .map_err(plot_error)?;
    if let Some((actual_label, _)) = &options.legends {
        bars.label(actual_label.as_str()).legend(move |(x, y)| {
            Rectangle::new([(x, y - 5), (x + 15, y + 5)], bar_color.filled())
        });
    }

    let line = chart
        .draw_series(LineSeries::new(
            time_axis.iter().copied().zip(predicted_values.iter().copied()),
            line_color.stroke_width(LINE_WIDTH),
        ))
        .map_err(plot_error)?;
    if let Some((_, predicted_label)) = &options.legends {
        line.label(predicted_label.as_str()).legend(move |(x, y)| {
            PathElement::new(vec![(x, y), (x + 15, y)], line_color.stroke_width(LINE_WIDTH))
        });
    }

    if options.legends.is_some() {
        chart
            .configure_series_labels()
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()
            .map_err(plot_error)?;
    }

    root.present().map_err(plot_error)?;
    debug!(path = %path.display(), points = n, "plot written");
    Ok(())
}

/// Minimum and maximum of a non-empty sequence.
fn bounds(values: impl IntoIterator<Item = f64>) -> (f64, f64) {
    values
        .into_iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        })
}

/// Bar width from the smallest gap between distinct time points.
fn bar_width(time_axis: &[f64]) -> f64 {
    let mut sorted = time_axis.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let gap = sorted
        .windows(2)
        .map(|w| w[1] - w[0])
        .filter(|&d| d > 0.0)
        .fold(f64::INFINITY, f64::min);
    if gap.is_finite() {
        gap * BAR_FILL
    } else {
        BAR_FILL
    }
}
