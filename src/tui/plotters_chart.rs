//! Plotters-powered trend chart widget for Ratatui.
//!
//! Plotters output is drawn into the Ratatui buffer via `plotters-ratatui-backend`.

use plotters::prelude::*;
use plotters_ratatui_backend::widget_fn;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};

use crate::app::pipeline::TrendOutput;
use crate::domain::TrendMetric;
use crate::render::trends::{date_label, series_points, x_bounds_days};

/// Per-metric points of every series, computed once per load.
#[derive(Debug, Clone)]
pub struct TrendSeries {
    pub metric: TrendMetric,
    pub keys: Vec<String>,
    pub lines: Vec<Vec<(f64, f64)>>,
    pub x_bounds: [f64; 2],
    pub y_bounds: [f64; 2],
}

impl TrendSeries {
    pub fn from_trends(trends: &TrendOutput, metric: TrendMetric) -> Self {
        let (keys, lines): (Vec<String>, Vec<Vec<(f64, f64)>>) = trends
            .groups
            .iter()
            .map(|(key, rows)| (key.to_string(), series_points(rows, metric)))
            .unzip();
        Self {
            metric,
            keys,
            lines,
            x_bounds: x_bounds_days(trends),
            y_bounds: [0.0, trends.y_max],
        }
    }
}

/// A render-only chart: all series in gray, `highlight` drawn on top.
pub struct TrendPlottersChart<'a> {
    pub series: &'a TrendSeries,
    /// Index into `series.keys`.
    pub highlight: Option<usize>,
}

impl Widget for TrendPlottersChart<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // Plotters may fail to build a chart in a tiny area.
        if area.width < 20 || area.height < 8 {
            buf.set_string(
                area.x,
                area.y,
                "Chart area too small (resize terminal).",
                Style::default().fg(Color::Yellow),
            );
            return;
        }

        let [x0, x1] = self.series.x_bounds;
        let [y0, y1] = self.series.y_bounds;
        if !(x0.is_finite() && x1.is_finite() && y0.is_finite() && y1.is_finite()) || x1 <= x0 || y1 <= y0 {
            return;
        }

        let series = self.series;
        let highlight = self.highlight;
        let widget = widget_fn(move |root| {
            let mut chart = ChartBuilder::on(&root)
                .margin(1)
                // Terminal cells are low-res, so keep label areas compact.
                .set_label_area_size(LabelAreaPosition::Left, 6)
                .set_label_area_size(LabelAreaPosition::Bottom, 3)
                .build_cartesian_2d(x0..x1, y0..y1)?;

            chart
                .configure_mesh()
                .disable_x_mesh()
                .disable_y_mesh()
                .x_desc("Year")
                .y_desc(series.metric.axis_label())
                .x_labels(4)
                .y_labels(5)
                .x_label_formatter(&|v| date_label(*v))
                .y_label_formatter(&|v| format!("{v:.1}"))
                .label_style(("sans-serif", 10).into_font().color(&WHITE))
                .axis_style(&WHITE)
                .bold_line_style(&WHITE)
                .draw()?;

            let gray = RGBColor(128, 128, 128);
            for (i, line) in series.lines.iter().enumerate() {
                if Some(i) == highlight {
                    continue;
                }
                chart.draw_series(LineSeries::new(line.iter().copied(), &gray))?;
            }

            if let Some(line) = highlight.and_then(|i| series.lines.get(i)) {
                let yellow = RGBColor(255, 255, 0);
                chart.draw_series(LineSeries::new(line.iter().copied(), &yellow))?;
            }

            Ok(())
        });

        widget.render(area, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::pipeline::build_trends;
    use crate::io::ingest::parse_timed_rows;

    #[test]
    fn series_follow_group_order() {
        let doc = serde_json::json!([
            {"Name": "Texas", "date": "2017-01-01", "del": 2.0, "npa": 1.0},
            {"Name": "Maine", "date": "2017-01-01", "del": 1.0, "npa": 3.0},
            {"Name": "Texas", "date": "2017-02-01", "del": 2.5, "npa": 1.0},
        ]);
        let trends = build_trends(&parse_timed_rows(&doc, "t").unwrap(), None).unwrap();
        let s = TrendSeries::from_trends(&trends, TrendMetric::Npa);
        assert_eq!(s.keys, vec!["Texas".to_string(), "Maine".to_string()]);
        assert_eq!(s.lines[0], vec![(17_167.0, 1.0), (17_198.0, 1.0)]);
        assert_eq!(s.y_bounds, [0.0, 3.0]);
    }
}
