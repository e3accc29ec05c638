//! Interactive map panel.
//!
//! A `MapHandle` owns one built map layer plus its view state. Handles are
//! created with [`create_map`], consumed by [`destroy_map`], and swapped with
//! [`rebuild_map`], which only drops the old handle once the new one exists.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    symbols::Marker,
    widgets::{
        Block, Borders, Widget,
        canvas::{Canvas, Line as CanvasLine},
    },
};

use crate::app::pipeline::MapLayer;
use crate::domain::{DEFAULT_MAP_VIEW, MapMode, MapView};
use crate::error::PipelineError;
use crate::io::geometry::{GeometryFeature, Ring};
use crate::scale::{NO_DATA, Rgb};

/// A live map widget.
#[derive(Debug)]
pub struct MapHandle {
    layer: MapLayer,
    view: MapView,
    hovered: Option<usize>,
}

/// Build a handle for `layer`, centered on `view`.
pub fn create_map(layer: MapLayer, view: MapView) -> Result<MapHandle, PipelineError> {
    if layer.geometry.bounds().is_none() {
        return Err(PipelineError::Geometry {
            location: layer.geometry.location.clone(),
            cause: "map layer has no drawable extent".to_string(),
        });
    }
    tracing::debug!(
        mode = ?layer.mode,
        features = layer.geometry.features.len(),
        zoom = view.zoom,
        "created map"
    );
    Ok(MapHandle {
        layer,
        view,
        hovered: None,
    })
}

/// Tear down a handle.
pub fn destroy_map(handle: MapHandle) {
    tracing::debug!(mode = ?handle.layer.mode, "destroyed map");
    drop(handle);
}

/// Replace `current` with a freshly built map at the default view.
///
/// On failure `current` is left untouched.
pub fn rebuild_map<F>(current: &mut Option<MapHandle>, build: F) -> Result<(), PipelineError>
where
    F: FnOnce() -> Result<MapLayer, PipelineError>,
{
    let next = create_map(build()?, DEFAULT_MAP_VIEW)?;
    if let Some(old) = current.replace(next) {
        destroy_map(old);
    }
    Ok(())
}

impl MapHandle {
    pub fn mode(&self) -> MapMode {
        self.layer.mode
    }

    pub fn view(&self) -> MapView {
        self.view
    }

    pub fn zoom_in(&mut self) {
        self.view.zoom_in();
    }

    pub fn zoom_out(&mut self) {
        self.view.zoom_out();
    }

    /// Move the hover to the next (or previous) feature, wrapping around.
    pub fn hover_step(&mut self, forward: bool) {
        self.hovered = cycle(self.hovered, self.layer.geometry.features.len(), forward);
    }

    pub fn clear_hover(&mut self) {
        self.hovered = None;
    }

    pub fn hovered_feature(&self) -> Option<&GeometryFeature> {
        self.hovered.and_then(|i| self.layer.geometry.features.get(i))
    }

    pub fn hovered_name(&self) -> Option<&str> {
        self.hovered_feature().and_then(|f| f.name.as_deref())
    }

    fn value_of(&self, name: Option<&str>) -> Option<f64> {
        let (lookup, _) = self.layer.values.as_ref()?;
        lookup.get(name?)
    }

    fn fill_of(&self, feature: &GeometryFeature) -> Rgb {
        match &self.layer.values {
            Some((lookup, scale)) => scale.color_or_no_data(feature.name.as_deref().and_then(|n| lookup.get(n))),
            None => NO_DATA,
        }
    }

    /// Text of the info box next to the map.
    pub fn info_text(&self) -> String {
        let name = self.hovered_name();
        match (self.layer.mode, name) {
            (MapMode::County, Some(name)) => format!("{name} County"),
            (MapMode::County, None) => "Hover over a county".to_string(),
            (MapMode::State, Some(name)) => match self.value_of(Some(name)) {
                Some(v) => format!("{name}: {v:.2}% delinquent"),
                None => format!("{name}: no data"),
            },
            (MapMode::State, None) => "Hover over a state".to_string(),
        }
    }

    pub fn widget(&self) -> MapWidget<'_> {
        MapWidget { handle: self }
    }
}

/// Next index in `0..len`, wrapping; `None` starts at either end.
pub fn cycle(current: Option<usize>, len: usize, forward: bool) -> Option<usize> {
    if len == 0 {
        return None;
    }
    Some(match (current, forward) {
        (None, true) => 0,
        (None, false) => len - 1,
        (Some(i), true) => (i + 1) % len,
        (Some(i), false) => (i + len - 1) % len,
    })
}

/// Canvas rendering of a [`MapHandle`].
pub struct MapWidget<'a> {
    handle: &'a MapHandle,
}

fn to_color(c: Rgb) -> Color {
    Color::Rgb(c.r, c.g, c.b)
}

fn ring_segments(ring: &Ring, color: Color) -> impl Iterator<Item = CanvasLine> + '_ {
    ring.windows(2)
        .map(move |w| CanvasLine::new(w[0].0, w[0].1, w[1].0, w[1].1, color))
}

impl Widget for MapWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let handle = self.handle;
        let (lon, lat) = handle.view.bounds();
        let title = format!(" {} (zoom {}) ", handle.layer.mode.label(), handle.view.zoom);

        Canvas::default()
            .block(Block::default().borders(Borders::ALL).title(title))
            .marker(Marker::Braille)
            .x_bounds(lon)
            .y_bounds(lat)
            .paint(|ctx| {
                for feature in &handle.layer.geometry.features {
                    let color = to_color(handle.fill_of(feature));
                    for ring in feature.rings() {
                        for line in ring_segments(ring, color) {
                            ctx.draw(&line);
                        }
                    }
                }
                if let Some(feature) = handle.hovered_feature() {
                    ctx.layer();
                    for ring in feature.rings() {
                        for line in ring_segments(ring, Color::White) {
                            ctx.draw(&line);
                        }
                    }
                }
            })
            .render(area, buf);

        if area.height > 2 && area.width > 20 {
            buf.set_string(
                area.x + 2,
                area.y + area.height - 1,
                format!(" {} ", handle.info_text()),
                Style::default().fg(Color::Yellow),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Domain, Lookup};
    use crate::io::geometry::GeometryLayer;
    use crate::scale::ColorScale;

    fn layer(mode: MapMode, names: &[&str]) -> MapLayer {
        let features = names
            .iter()
            .enumerate()
            .map(|(i, n)| GeometryFeature {
                name: Some(n.to_string()),
                polygons: vec![vec![vec![
                    (i as f64, 0.0),
                    (i as f64 + 1.0, 0.0),
                    (i as f64 + 1.0, 1.0),
                    (i as f64, 0.0),
                ]]],
            })
            .collect();
        MapLayer {
            mode,
            geometry: GeometryLayer {
                location: "t".to_string(),
                features,
            },
            values: None,
        }
    }

    #[test]
    fn failed_rebuild_keeps_current_map() {
        let mut current = Some(create_map(layer(MapMode::State, &["AL"]), DEFAULT_MAP_VIEW).unwrap());
        let err = rebuild_map(&mut current, || Err(PipelineError::data_load("counties.geojson", "offline")));
        assert!(err.is_err());
        assert_eq!(current.as_ref().unwrap().mode(), MapMode::State);

        rebuild_map(&mut current, || Ok(layer(MapMode::County, &["Cook"]))).unwrap();
        assert_eq!(current.as_ref().unwrap().mode(), MapMode::County);
    }

    #[test]
    fn rebuild_resets_view() {
        let mut current = Some(create_map(layer(MapMode::State, &["AL"]), DEFAULT_MAP_VIEW).unwrap());
        if let Some(h) = current.as_mut() {
            h.zoom_in();
            h.zoom_in();
        }
        rebuild_map(&mut current, || Ok(layer(MapMode::State, &["AL"]))).unwrap();
        assert_eq!(current.unwrap().view(), DEFAULT_MAP_VIEW);
    }

    #[test]
    fn county_info_box_follows_hover() {
        let mut h = create_map(layer(MapMode::County, &["Cook", "Lake"]), DEFAULT_MAP_VIEW).unwrap();
        assert_eq!(h.info_text(), "Hover over a county");
        h.hover_step(true);
        assert_eq!(h.info_text(), "Cook County");
        h.hover_step(false);
        assert_eq!(h.info_text(), "Lake County");
        h.clear_hover();
        assert_eq!(h.info_text(), "Hover over a county");
    }

    #[test]
    fn state_info_box_shows_value() {
        let mut l = layer(MapMode::State, &["AL"]);
        let mut lookup = Lookup::default();
        lookup.values.insert("AL".to_string(), 2.5);
        l.values = Some((lookup, ColorScale::zero_anchored(&Domain { min: 1.0, max: 5.0 })));
        let mut h = create_map(l, DEFAULT_MAP_VIEW).unwrap();
        h.hover_step(true);
        assert_eq!(h.info_text(), "AL: 2.50% delinquent");
    }

    #[test]
    fn degenerate_layer_is_rejected() {
        let mut l = layer(MapMode::State, &["AL"]);
        l.geometry.features[0].polygons = vec![vec![vec![(1.0, 1.0)]]];
        assert!(create_map(l, DEFAULT_MAP_VIEW).is_err());
    }

    #[test]
    fn cycle_wraps_both_ways() {
        assert_eq!(cycle(None, 3, true), Some(0));
        assert_eq!(cycle(None, 3, false), Some(2));
        assert_eq!(cycle(Some(2), 3, true), Some(0));
        assert_eq!(cycle(Some(0), 3, false), Some(2));
        assert_eq!(cycle(Some(0), 0, true), None);
    }
}
