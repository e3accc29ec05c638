//! HMDA mortgage-volume state map with the threshold palette.

use std::path::Path;

use plotters::coord::Shift;
use plotters::prelude::*;

use crate::app::pipeline::VolumeOutput;
use crate::error::AppError;
use crate::io::geometry::GeometryLayer;
use crate::render::choropleth::draw_choropleth;
use crate::render::{DrawResult, write_svg};
use crate::scale::NO_DATA;

pub const FILE_NAME: &str = "volume_map.svg";
pub const TITLE: &str = "Mortgage Originations by State (HMDA)";

pub fn write_volume_map(
    path: &Path,
    geometry: &GeometryLayer,
    volume: &VolumeOutput,
    size: (u32, u32),
) -> Result<(), AppError> {
    write_svg(path, size, |root| draw_volume_map(root, geometry, volume))
}

pub fn draw_volume_map<DB>(root: &DrawingArea<DB, Shift>, geometry: &GeometryLayer, volume: &VolumeOutput) -> DrawResult
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let mut legend = volume.scale.legend();
    legend.push(("No data".to_string(), NO_DATA));
    draw_choropleth(root, geometry, TITLE, "Originations", &legend, |name| {
        name.and_then(|n| volume.lookup.get(n))
            .map(|v| volume.scale.color(v))
            .unwrap_or(NO_DATA)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Lookup;
    use crate::io::geometry::GeometryFeature;
    use crate::scale::StepScale;

    #[test]
    fn counts_fill_by_step() {
        let geometry = GeometryLayer {
            location: "t".to_string(),
            features: vec![GeometryFeature {
                name: Some("Texas".to_string()),
                polygons: vec![vec![vec![(-100.0, 30.0), (-95.0, 30.0), (-95.0, 35.0), (-100.0, 30.0)]]],
            }],
        };
        let mut lookup = Lookup::default();
        lookup.values.insert("Texas".to_string(), 1500.0);
        let volume = VolumeOutput {
            lookup,
            scale: StepScale::volume(),
            rows_read: 1,
            row_errors: Vec::new(),
        };

        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, (500, 400)).into_drawing_area();
            draw_volume_map(&root, &geometry, &volume).unwrap();
            root.present().unwrap();
        }
        assert_eq!(svg.matches("<polygon").count(), 1);
        assert!(svg.to_lowercase().contains("fill=\"#800026\""));
    }
}
