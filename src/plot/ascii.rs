//! ASCII plotting of the trend series for terminal output.
//!
//! Fixed-size grid, deterministic output (helpful for golden tests).
//!
//! Plot elements:
//! - every series: `.` line
//! - highlighted series: `#` line, drawn last over the others

use crate::app::pipeline::TrendOutput;
use crate::domain::TrendMetric;
use crate::render::trends::{series_points, x_bounds_days};

/// Render all series of `metric`, optionally highlighting one by name.
pub fn render_ascii_trends(
    trends: &TrendOutput,
    metric: TrendMetric,
    highlight: Option<&str>,
    width: usize,
    height: usize,
) -> String {
    let width = width.max(10);
    let height = height.max(5);
    let [t_min, t_max] = x_bounds_days(trends);
    let (y_min, y_max) = (0.0, trends.y_max);

    let mut grid = vec![vec![' '; width]; height];

    for (key, rows) in trends.groups.iter() {
        if highlight == Some(key) {
            continue;
        }
        let pts = series_points(rows, metric);
        draw_series(&mut grid, &pts, [t_min, t_max], [y_min, y_max], '.', false);
    }

    let highlight_note = match highlight {
        Some(name) => match trends.groups.get(name) {
            Some(rows) => {
                let pts = series_points(rows, metric);
                draw_series(&mut grid, &pts, [t_min, t_max], [y_min, y_max], '#', true);
                format!(" | highlight={name}")
            }
            None => format!(" | highlight={name} (not found)"),
        },
        None => String::new(),
    };

    let mut out = String::new();
    out.push_str(&format!(
        "{} | {} .. {} | y=[{y_min:.2}, {y_max:.2}] | series={}{highlight_note}\n",
        metric.axis_label(),
        trends.time_domain.min,
        trends.time_domain.max,
        trends.groups.len(),
    ));

    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }

    out
}

fn map_x(t: f64, t_min: f64, t_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((t - t_min) / (t_max - t_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_series(grid: &mut [Vec<char>], pts: &[(f64, f64)], x: [f64; 2], y: [f64; 2], ch: char, overwrite: bool) {
    let height = grid.len();
    let width = grid[0].len();

    let mut prev = None;
    for &(t, v) in pts {
        let cx = map_x(t, x[0], x[1], width);
        let cy = map_y(v, y[0], y[1], height);
        let from = prev.unwrap_or((cx, cy));
        draw_line(grid, from, (cx, cy), ch, overwrite);
        prev = Some((cx, cy));
    }
}

/// Integer line drawing (Bresenham).
fn draw_line(grid: &mut [Vec<char>], from: (usize, usize), to: (usize, usize), ch: char, overwrite: bool) {
    let (mut x0, mut y0) = (from.0 as isize, from.1 as isize);
    let (x1, y1) = (to.0 as isize, to.1 as isize);

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0 && (y0 as usize) < grid.len() && x0 >= 0 && (x0 as usize) < grid[0].len() {
            let cell = &mut grid[y0 as usize][x0 as usize];
            if overwrite || *cell == ' ' {
                *cell = ch;
            }
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::pipeline::build_trends;
    use crate::io::ingest::parse_timed_rows;

    fn crossing() -> TrendOutput {
        let doc = serde_json::json!([
            {"Name": "A", "date": "2017-01-01", "del": 0.0, "npa": 0.0},
            {"Name": "A", "date": "2017-06-01", "del": 4.0, "npa": 0.0},
            {"Name": "B", "date": "2017-01-01", "del": 4.0, "npa": 0.0},
            {"Name": "B", "date": "2017-06-01", "del": 0.0, "npa": 0.0},
        ]);
        build_trends(&parse_timed_rows(&doc, "t").unwrap(), None).unwrap()
    }

    #[test]
    fn plot_golden_snapshot_small() {
        let txt = render_ascii_trends(&crossing(), TrendMetric::Del, Some("B"), 10, 5);
        let expected = concat!(
            "Delinquency Rate (%) | 2017-01-01 .. 2017-06-01 | y=[0.00, 4.00] | series=2 | highlight=B\n",
            "##      ..\n",
            "  ##  ..  \n",
            "    ##    \n",
            "  ..  ##  \n",
            "..      ##\n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn unknown_highlight_is_reported() {
        let txt = render_ascii_trends(&crossing(), TrendMetric::Del, Some("Zed"), 10, 5);
        assert!(txt.lines().next().unwrap().ends_with("highlight=Zed (not found)"));
        assert!(!txt.contains('#'));
    }
}
