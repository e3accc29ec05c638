//! State choropleths: one polygon per feature, filled from a lookup.

use std::path::Path;

use plotters::coord::Shift;
use plotters::prelude::*;

use crate::app::pipeline::MapOutput;
use crate::domain::{Lookup, Metric};
use crate::error::AppError;
use crate::io::geometry::GeometryLayer;
use crate::render::{DrawResult, draw_legend, ramp_legend, rgb, write_svg};
use crate::scale::Rgb;

pub const DEL_MAP_TITLE: &str = "Mortgage Delinquency (30-90 days overdue) by State (2017)";
pub const NPA_MAP_TITLE: &str = "Mortgage NPA (90+ days overdue) by State (2017)";

const LEGEND_WIDTH: u32 = 140;
const TITLE_COLOR: RGBColor = RGBColor(0, 0, 128);

pub fn title(metric: Metric) -> &'static str {
    match metric {
        Metric::MeanNpa | Metric::Npa => NPA_MAP_TITLE,
        _ => DEL_MAP_TITLE,
    }
}

pub fn file_name(metric: Metric) -> &'static str {
    match metric {
        Metric::MeanNpa | Metric::Npa => "npa_map.svg",
        _ => "delinquency_map.svg",
    }
}

fn lookup_for(maps: &MapOutput, metric: Metric) -> &Lookup {
    match metric {
        Metric::MeanNpa | Metric::Npa => &maps.npa,
        _ => &maps.delinquency,
    }
}

/// Write the `metric` map of a run, colored with the run's shared scale.
pub fn write_metric_map(path: &Path, maps: &MapOutput, metric: Metric, size: (u32, u32)) -> Result<(), AppError> {
    write_svg(path, size, |root| draw_metric_map(root, maps, metric))
}

pub fn draw_metric_map<DB>(root: &DrawingArea<DB, Shift>, maps: &MapOutput, metric: Metric) -> DrawResult
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let lookup = lookup_for(maps, metric);
    let legend = ramp_legend(&maps.color_scale, 6);
    draw_choropleth(
        root,
        &maps.geometry,
        title(metric),
        metric.display_name(),
        &legend,
        |name| maps.color_scale.color_or_no_data(name.and_then(|n| lookup.get(n))),
    )
}

/// Title, map panel and legend column.
///
/// `fill` receives the feature's name (if any) and returns its color.
pub fn draw_choropleth<DB, F>(
    root: &DrawingArea<DB, Shift>,
    geometry: &GeometryLayer,
    title: &str,
    legend_heading: &str,
    legend: &[(String, Rgb)],
    fill: F,
) -> DrawResult
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
    F: Fn(Option<&str>) -> Rgb,
{
    root.fill(&WHITE)?;
    let body = root.titled(title, ("sans-serif", 20).into_font().color(&TITLE_COLOR))?;

    let (width, _) = body.dim_in_pixel();
    let (map_area, legend_area) = body.split_horizontally(width.saturating_sub(LEGEND_WIDTH));

    let ([lon0, lon1], [lat0, lat1]) = geometry
        .bounds()
        .ok_or_else(|| format!("geometry '{}' has no finite extent", geometry.location))?;
    let pad_lon = (lon1 - lon0) * 0.02;
    let pad_lat = (lat1 - lat0) * 0.02;

    let mut chart = ChartBuilder::on(&map_area)
        .margin(10)
        .build_cartesian_2d((lon0 - pad_lon)..(lon1 + pad_lon), (lat0 - pad_lat)..(lat1 + pad_lat))?;

    for feature in &geometry.features {
        let color = rgb(fill(feature.name.as_deref()));
        // Outer rings are filled; holes only get an outline.
        chart.draw_series(
            feature
                .polygons
                .iter()
                .filter_map(|rings| rings.first())
                .map(|outer| Polygon::new(outer.clone(), color.filled())),
        )?;
        chart.draw_series(
            feature
                .rings()
                .map(|ring| PathElement::new(ring.clone(), BLACK.stroke_width(1))),
        )?;
    }

    draw_legend(&legend_area, legend_heading, legend)
}
