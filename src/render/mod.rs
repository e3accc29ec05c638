//! SVG output for the state maps and trend charts.
//!
//! Drawing functions are generic over the plotters backend so tests can draw
//! into an in-memory SVG string; `write_svg` is the only place that touches
//! the filesystem.

use std::path::{Path, PathBuf};

use plotters::coord::Shift;
use plotters::prelude::*;

use crate::app::pipeline::RunOutput;
use crate::domain::{Metric, RunConfig, TrendMetric};
use crate::error::AppError;
use crate::scale::{ColorScale, NO_DATA, Rgb};

pub mod choropleth;
pub mod trends;
pub mod volume;

pub(crate) type DrawResult = Result<(), Box<dyn std::error::Error>>;

pub(crate) fn rgb(c: Rgb) -> RGBColor {
    RGBColor(c.r, c.g, c.b)
}

/// Draw into a new SVG file at `path`.
pub(crate) fn write_svg<F>(path: &Path, size: (u32, u32), draw: F) -> Result<(), AppError>
where
    F: FnOnce(&DrawingArea<SVGBackend<'_>, Shift>) -> DrawResult,
{
    let root = SVGBackend::new(path, size).into_drawing_area();
    draw(&root)
        .and_then(|()| root.present().map_err(|e| e.into()))
        .map_err(|e| AppError::new(4, format!("Failed to render '{}': {e}", path.display())))?;
    tracing::info!(path = %path.display(), width = size.0, height = size.1, "wrote chart");
    Ok(())
}

/// Evenly spaced legend entries over `[0, max]` of a color scale, plus "no data".
pub fn ramp_legend(scale: &ColorScale, steps: usize) -> Vec<(String, Rgb)> {
    let [lo, hi] = scale.domain();
    let steps = steps.max(2);
    let mut out: Vec<(String, Rgb)> = (0..steps)
        .rev()
        .map(|i| {
            let v = lo + (hi - lo) * i as f64 / (steps - 1) as f64;
            (format!("{v:.2}"), scale.color(v))
        })
        .collect();
    out.push(("No data".to_string(), NO_DATA));
    out
}

/// Swatch + label column.
pub(crate) fn draw_legend<DB>(area: &DrawingArea<DB, Shift>, heading: &str, entries: &[(String, Rgb)]) -> DrawResult
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let font = ("sans-serif", 13).into_font();
    area.draw(&Text::new(heading.to_string(), (10, 12), font.clone()))?;
    for (i, (label, color)) in entries.iter().enumerate() {
        let y = 36 + i as i32 * 22;
        area.draw(&Rectangle::new([(10, y), (28, y + 16)], rgb(*color).filled()))?;
        area.draw(&Rectangle::new([(10, y), (28, y + 16)], BLACK.stroke_width(1)))?;
        area.draw(&Text::new(label.clone(), (36, y + 2), font.clone()))?;
    }
    Ok(())
}

/// Render every chart of a run into `config.out_dir`; returns the written paths.
pub fn render_all(config: &RunConfig, run: &RunOutput) -> Result<Vec<PathBuf>, AppError> {
    std::fs::create_dir_all(&config.out_dir).map_err(|e| {
        AppError::new(
            4,
            format!("Failed to create output directory '{}': {e}", config.out_dir.display()),
        )
    })?;

    let map_size = (config.map_width, config.map_height);
    let chart_size = (config.chart_width, config.chart_height);
    let mut written = Vec::new();

    for metric in [Metric::MeanDel, Metric::MeanNpa] {
        let path = config.out_dir.join(choropleth::file_name(metric));
        choropleth::write_metric_map(&path, &run.maps, metric, map_size)?;
        written.push(path);
    }

    match &run.trends {
        Ok(trends) => {
            for metric in TrendMetric::ALL {
                let path = config.out_dir.join(trends::file_name(metric));
                trends::write_trend_chart(&path, trends, metric, config.highlight.as_deref(), chart_size)?;
                written.push(path);
            }
        }
        Err(err) => tracing::warn!(error = %err, "skipping trend charts"),
    }

    if let Some(Ok(vol)) = &run.volume {
        let path = config.out_dir.join(volume::FILE_NAME);
        volume::write_volume_map(&path, &run.maps.geometry, vol, map_size)?;
        written.push(path);
    }

    Ok(written)
}
