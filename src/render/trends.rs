//! Trend line charts: every series in light gray, one highlighted in black.

use std::path::Path;

use chrono::DateTime;
use plotters::coord::Shift;
use plotters::prelude::*;

use crate::app::pipeline::TrendOutput;
use crate::domain::{Record, TimedRow, TrendMetric};
use crate::error::AppError;
use crate::render::{DrawResult, write_svg};

const MS_PER_DAY: f64 = 86_400_000.0;
const SERIES_GRAY: RGBColor = RGBColor(211, 211, 211);
/// Plotters strokes are whole pixels; half opacity stands in for a 0.5 width.
const SERIES_ALPHA: f64 = 0.5;

pub fn file_name(metric: TrendMetric) -> &'static str {
    match metric {
        TrendMetric::Del => "del_trends.svg",
        TrendMetric::Npa => "npa_trends.svg",
    }
}

pub fn write_trend_chart(
    path: &Path,
    trends: &TrendOutput,
    metric: TrendMetric,
    highlight: Option<&str>,
    size: (u32, u32),
) -> Result<(), AppError> {
    write_svg(path, size, |root| draw_trend_chart(root, trends, metric, highlight))
}

/// `(days since epoch, value)` points of one series, in date order.
pub fn series_points(rows: &[TimedRow], metric: TrendMetric) -> Vec<(f64, f64)> {
    let metric = metric.to_metric();
    let mut sorted: Vec<&TimedRow> = rows.iter().collect();
    sorted.sort_by_key(|r| r.epoch_ms());
    sorted
        .into_iter()
        .filter_map(|r| r.metric(metric).map(|v| (r.epoch_ms() as f64 / MS_PER_DAY, v)))
        .collect()
}

/// X bounds in days; a single-date domain is widened by a day on each side.
pub fn x_bounds_days(trends: &TrendOutput) -> [f64; 2] {
    let x0 = trends.x_bounds_ms[0] as f64 / MS_PER_DAY;
    let x1 = trends.x_bounds_ms[1] as f64 / MS_PER_DAY;
    if x1 > x0 { [x0, x1] } else { [x0 - 1.0, x0 + 1.0] }
}

pub fn date_label(days: f64) -> String {
    DateTime::from_timestamp((days * 86_400.0).round() as i64, 0)
        .map(|dt| dt.format("%b %Y").to_string())
        .unwrap_or_default()
}

pub fn draw_trend_chart<DB>(
    root: &DrawingArea<DB, Shift>,
    trends: &TrendOutput,
    metric: TrendMetric,
    highlight: Option<&str>,
) -> DrawResult
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;
    let [x0, x1] = x_bounds_days(trends);

    let mut chart = ChartBuilder::on(root)
        .caption(metric.title(), ("sans-serif", 16).into_font())
        .margin(12)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(x0..x1, 0.0..trends.y_max)?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc("Year")
        .y_desc(metric.axis_label())
        .x_labels(6)
        .y_labels(6)
        .x_label_formatter(&|v| date_label(*v))
        .axis_desc_style(("sans-serif", 12).into_font())
        .draw()?;

    for (key, rows) in trends.groups.iter() {
        if highlight == Some(key) {
            continue;
        }
        let style = SERIES_GRAY.mix(SERIES_ALPHA).stroke_width(1);
        chart.draw_series(LineSeries::new(series_points(rows, metric), style))?;
    }

    let Some(name) = highlight else {
        return Ok(());
    };
    let Some(rows) = trends.groups.get(name) else {
        tracing::warn!(series = name, "highlighted series not found");
        return Ok(());
    };
    chart.draw_series(LineSeries::new(series_points(rows, metric), BLACK.stroke_width(3)))?;

    // Label box in the top-right corner of the plot.
    let (width, _) = root.dim_in_pixel();
    let right = width as i32 - 24;
    let left = right - 150;
    root.draw(&Rectangle::new([(left, 44), (right, 70)], WHITE.filled()))?;
    root.draw(&Rectangle::new([(left, 44), (right, 70)], BLACK.stroke_width(1)))?;
    root.draw(&Text::new(name.to_string(), (left + 8, 50), ("sans-serif", 14).into_font()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::pipeline::build_trends;
    use crate::io::ingest::parse_timed_rows;

    fn trends() -> TrendOutput {
        let doc = serde_json::json!([
            {"Name": "Ohio", "date": "2017-06-01", "del": 3.0, "npa": 1.0},
            {"Name": "Ohio", "date": "2017-01-01", "del": 2.0, "npa": 1.5},
            {"Name": "Iowa", "date": "2017-01-01", "del": 1.0, "npa": 0.5},
            {"Name": "Iowa", "date": "2017-06-01", "del": 1.5, "npa": 0.7},
        ]);
        build_trends(&parse_timed_rows(&doc, "t").unwrap(), None).unwrap()
    }

    #[test]
    fn points_are_date_ordered() {
        let t = trends();
        let pts = series_points(t.groups.get("Ohio").unwrap(), TrendMetric::Del);
        assert_eq!(pts.len(), 2);
        assert!(pts[0].0 < pts[1].0);
        assert_eq!(pts[0].1, 2.0);
    }

    #[test]
    fn date_labels_use_month_and_year() {
        // 2017-01-01
        assert_eq!(date_label(17_167.0), "Jan 2017");
    }

    #[test]
    fn highlighted_series_gets_label_box() {
        let t = trends();
        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, (800, 400)).into_drawing_area();
            draw_trend_chart(&root, &t, TrendMetric::Del, Some("Ohio")).unwrap();
            root.present().unwrap();
        }
        assert!(svg.contains("Ohio"));
        assert!(svg.contains("Delinquency Rate (%)"));
        assert!(svg.to_lowercase().contains("stroke-width=\"3\""));
    }

    #[test]
    fn background_series_are_faint() {
        let t = trends();
        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, (800, 400)).into_drawing_area();
            draw_trend_chart(&root, &t, TrendMetric::Del, None).unwrap();
            root.present().unwrap();
        }
        let line = svg
            .lines()
            .find(|l| l.contains("<polyline") && l.contains("#D3D3D3"))
            .unwrap();
        assert!(line.contains("opacity=\"0.5\""), "{line}");
        assert!(line.contains("stroke-width=\"1\""), "{line}");
    }
}
