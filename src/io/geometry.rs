//! GeoJSON feature extraction.
//!
//! Features are only iterated and keyed by name; coordinates are kept as
//! plain lon/lat rings for the drawing layer.

use geojson::{GeoJson, Geometry, Value};
use serde_json::Value as JsonValue;

use crate::error::PipelineError;

/// Property keys tried for the entity name when none is configured.
pub const DEFAULT_NAME_PROPERTIES: [&str; 3] = ["State", "name", "NAME"];

/// One closed ring of `(lon, lat)` points.
pub type Ring = Vec<(f64, f64)>;

/// A named region: polygons, each an outer ring followed by holes.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryFeature {
    pub name: Option<String>,
    pub polygons: Vec<Vec<Ring>>,
}

impl GeometryFeature {
    /// Every ring of every polygon.
    pub fn rings(&self) -> impl Iterator<Item = &Ring> + '_ {
        self.polygons.iter().flat_map(|p| p.iter())
    }
}

/// Parsed feature collection of one map layer.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryLayer {
    pub location: String,
    pub features: Vec<GeometryFeature>,
}

impl GeometryLayer {
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.features.iter().filter_map(|f| f.name.as_deref())
    }

    /// `([lon_min, lon_max], [lat_min, lat_max])` over all rings.
    pub fn bounds(&self) -> Option<([f64; 2], [f64; 2])> {
        let mut lon = [f64::INFINITY, f64::NEG_INFINITY];
        let mut lat = [f64::INFINITY, f64::NEG_INFINITY];
        for feature in &self.features {
            for ring in feature.rings() {
                for &(x, y) in ring {
                    lon = [lon[0].min(x), lon[1].max(x)];
                    lat = [lat[0].min(y), lat[1].max(y)];
                }
            }
        }
        let finite = lon.iter().chain(lat.iter()).all(|v| v.is_finite());
        if finite && lon[0] < lon[1] && lat[0] < lat[1] {
            Some((lon, lat))
        } else {
            None
        }
    }
}

/// Parse a GeoJSON document into a [`GeometryLayer`].
///
/// `name_property` selects the name key; `None` tries [`DEFAULT_NAME_PROPERTIES`].
/// Non-areal geometries are skipped.
pub fn parse_geometry(text: &str, location: &str, name_property: Option<&str>) -> Result<GeometryLayer, PipelineError> {
    let geojson: GeoJson = text
        .parse()
        .map_err(|e| PipelineError::data_load(location, format!("invalid GeoJSON: {e}")))?;

    let features = match geojson {
        GeoJson::FeatureCollection(fc) => fc.features,
        GeoJson::Feature(f) => vec![f],
        GeoJson::Geometry(_) => {
            return Err(PipelineError::Geometry {
                location: location.to_string(),
                cause: "expected a Feature or FeatureCollection, found a bare Geometry".to_string(),
            });
        }
    };

    let mut out = Vec::with_capacity(features.len());
    let mut skipped = 0usize;
    for feature in features {
        let name = feature
            .properties
            .as_ref()
            .and_then(|props| extract_name(props, name_property));

        let polygons = feature.geometry.as_ref().map(collect_polygons).unwrap_or_default();
        if polygons.is_empty() {
            skipped += 1;
            continue;
        }
        out.push(GeometryFeature { name, polygons });
    }

    if out.is_empty() {
        return Err(PipelineError::Geometry {
            location: location.to_string(),
            cause: "no polygon features".to_string(),
        });
    }

    let unnamed = out.iter().filter(|f| f.name.is_none()).count();
    if unnamed > 0 {
        tracing::warn!(location, unnamed, "features without a name property");
    }
    tracing::info!(location, features = out.len(), skipped, "parsed geometry");

    Ok(GeometryLayer {
        location: location.to_string(),
        features: out,
    })
}

fn extract_name(props: &serde_json::Map<String, JsonValue>, name_property: Option<&str>) -> Option<String> {
    let value = match name_property {
        Some(key) => props.get(key),
        None => DEFAULT_NAME_PROPERTIES.iter().find_map(|k| props.get(*k)),
    }?;
    match value {
        JsonValue::String(s) => Some(s.trim().to_string()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn collect_polygons(geometry: &Geometry) -> Vec<Vec<Ring>> {
    match &geometry.value {
        Value::Polygon(rings) => vec![to_rings(rings)],
        Value::MultiPolygon(polys) => polys.iter().map(|p| to_rings(p)).collect(),
        Value::GeometryCollection(geoms) => geoms.iter().flat_map(collect_polygons).collect(),
        _ => Vec::new(),
    }
}

fn to_rings(rings: &[Vec<Vec<f64>>]) -> Vec<Ring> {
    rings
        .iter()
        .map(|ring| {
            ring.iter()
                .filter(|c| c.len() >= 2)
                .map(|c| (c[0], c[1]))
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_STATES: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "properties": {"State": "AL"},
             "geometry": {"type": "Polygon", "coordinates": [[[-88,30],[-85,30],[-85,35],[-88,35],[-88,30]]]}},
            {"type": "Feature", "properties": {"State": "AK", "name": "Alaska"},
             "geometry": {"type": "MultiPolygon", "coordinates": [
                [[[-170,55],[-140,55],[-140,70],[-170,70],[-170,55]]],
                [[[-160,52],[-158,52],[-158,53],[-160,52]]]
             ]}},
            {"type": "Feature", "properties": {"State": "XX"},
             "geometry": {"type": "Point", "coordinates": [0, 0]}}
        ]
    }"#;

    #[test]
    fn features_keyed_by_default_property() {
        let layer = parse_geometry(TWO_STATES, "t", None).unwrap();
        let names: Vec<&str> = layer.names().collect();
        assert_eq!(names, vec!["AL", "AK"]);
        assert_eq!(layer.features[1].polygons.len(), 2);
    }

    #[test]
    fn explicit_name_property_wins() {
        let layer = parse_geometry(TWO_STATES, "t", Some("name")).unwrap();
        assert_eq!(layer.features[0].name, None);
        assert_eq!(layer.features[1].name.as_deref(), Some("Alaska"));
    }

    #[test]
    fn bounds_cover_all_rings() {
        let layer = parse_geometry(TWO_STATES, "t", None).unwrap();
        let (lon, lat) = layer.bounds().unwrap();
        assert_eq!(lon, [-170.0, -85.0]);
        assert_eq!(lat, [30.0, 70.0]);
    }

    #[test]
    fn bare_geometry_is_rejected() {
        let text = r#"{"type": "Point", "coordinates": [0, 0]}"#;
        assert!(matches!(parse_geometry(text, "t", None), Err(PipelineError::Geometry { .. })));
    }
}
