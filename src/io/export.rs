//! Export the joined state table to CSV.
//!
//! One row per geometry feature, meant for spreadsheets or downstream scripts.

use std::path::Path;

use crate::app::pipeline::MapOutput;
use crate::error::AppError;

const HEADER: [&str; 7] = ["name", "mean_del", "mean_npa", "del_scale", "npa_scale", "del_fill", "npa_fill"];

/// Write `name, mean_del, mean_npa, scale inputs, fill colors` per feature.
pub fn write_join_csv(path: &Path, maps: &MapOutput) -> Result<(), AppError> {
    let mut w = csv::Writer::from_path(path)
        .map_err(|e| AppError::new(4, format!("Failed to create export CSV '{}': {e}", path.display())))?;

    w.write_record(HEADER)
        .map_err(|e| AppError::new(4, format!("Failed to write export CSV header: {e}")))?;

    for name in maps.geometry.names() {
        let del = maps.delinquency.get(name);
        let npa = maps.npa.get(name);
        w.write_record([
            name.to_string(),
            fmt_opt(del),
            fmt_opt(npa),
            fmt_opt(del.map(|v| maps.color_scale.normalize(v))),
            fmt_opt(npa.map(|v| maps.color_scale.normalize(v))),
            maps.color_scale.color_or_no_data(del).to_hex(),
            maps.color_scale.color_or_no_data(npa).to_hex(),
        ])
        .map_err(|e| AppError::new(4, format!("Failed to write export CSV row: {e}")))?;
    }

    w.flush()
        .map_err(|e| AppError::new(4, format!("Failed to flush export CSV '{}': {e}", path.display())))?;

    tracing::info!(path = %path.display(), "wrote join export");
    Ok(())
}

fn fmt_opt(v: Option<f64>) -> String {
    v.map(|v| format!("{v:.6}")).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::pipeline::build_maps;
    use crate::domain::AggregateRow;
    use crate::io::geometry::{GeometryFeature, GeometryLayer};

    fn feature(name: &str) -> GeometryFeature {
        GeometryFeature {
            name: Some(name.to_string()),
            polygons: vec![vec![vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 0.0)]]],
        }
    }

    #[test]
    fn names_with_commas_are_quoted() {
        let geometry = GeometryLayer {
            location: "t".to_string(),
            features: vec![feature("Washington, D.C."), feature("AL")],
        };
        let rows = vec![AggregateRow {
            name: "Washington, D.C.".to_string(),
            mean_del: Some(2.0),
            mean_npa: Some(1.0),
        }];
        let maps = build_maps(geometry, &rows, &rows, false).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("join.csv");
        write_join_csv(&path, &maps).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "name,mean_del,mean_npa,del_scale,npa_scale,del_fill,npa_fill");
        assert!(lines[1].starts_with("\"Washington, D.C.\",2.000000,1.000000,1.000000,0.500000,"));
        assert_eq!(lines[2], "AL,,,,,#d3d3d3,#d3d3d3");
    }
}
