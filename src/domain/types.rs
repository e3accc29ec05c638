//! Shared domain types.
//!
//! These types are kept small and serializable so they can be:
//!
//! - produced by ingest and consumed by the transform folds
//! - exported to CSV/JSON
//! - handed to any renderer (SVG, ASCII, TUI) without reshaping

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use chrono::NaiveDateTime;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Numeric column of a record.
///
/// Replaces the string field names (`"mean_del"`, `"npa"`, ...) the datasets
/// use, so a fold can only ask for a column that exists in the data model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Mean delinquency rate (aggregate tables).
    MeanDel,
    /// Mean NPA rate (aggregate tables).
    MeanNpa,
    /// Delinquency rate (time series).
    Del,
    /// NPA rate (time series).
    Npa,
    /// Mortgage origination count (HMDA CSV).
    Count,
}

impl Metric {
    /// Column name as it appears in the source documents.
    pub fn column(self) -> &'static str {
        match self {
            Metric::MeanDel => "mean_del",
            Metric::MeanNpa => "mean_npa",
            Metric::Del => "del",
            Metric::Npa => "npa",
            Metric::Count => "count",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Metric::MeanDel | Metric::Del => "Delinquency",
            Metric::MeanNpa | Metric::Npa => "NPA",
            Metric::Count => "Mortgage volume",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// Which time-series metric a trend chart plots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TrendMetric {
    Del,
    Npa,
}

impl TrendMetric {
    pub const ALL: [TrendMetric; 2] = [TrendMetric::Del, TrendMetric::Npa];

    pub fn to_metric(self) -> Metric {
        match self {
            TrendMetric::Del => Metric::Del,
            TrendMetric::Npa => Metric::Npa,
        }
    }

    pub fn axis_label(self) -> &'static str {
        match self {
            TrendMetric::Del => "Delinquency Rate (%)",
            TrendMetric::Npa => "NPA Rate (%)",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            TrendMetric::Del => "Delinquencies have declined slowly despite seasonal highs",
            TrendMetric::Npa => "Mortgage NPA rates have declined after initial rise post 2008",
        }
    }
}

/// A named entity carrying numeric metric columns.
pub trait Record {
    /// Entity key (state or county name).
    fn name(&self) -> &str;

    /// Value of `metric`, or `None` when the record has no such column.
    fn metric(&self, metric: Metric) -> Option<f64>;
}

/// One row of an aggregate table (`yoy_*_rates_state.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateRow {
    pub name: String,
    pub mean_del: Option<f64>,
    pub mean_npa: Option<f64>,
}

impl Record for AggregateRow {
    fn name(&self) -> &str {
        &self.name
    }

    fn metric(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::MeanDel => self.mean_del,
            Metric::MeanNpa => self.mean_npa,
            _ => None,
        }
    }
}

/// One dated observation of the performance-trends series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedRow {
    pub name: String,
    /// Date exactly as written in the source; the canonical axis endpoint.
    pub date_raw: String,
    pub observed_at: NaiveDateTime,
    pub del: f64,
    pub npa: f64,
}

impl TimedRow {
    /// Milliseconds since the Unix epoch (UTC), as the time scale compares them.
    pub fn epoch_ms(&self) -> i64 {
        self.observed_at.and_utc().timestamp_millis()
    }
}

impl Record for TimedRow {
    fn name(&self) -> &str {
        &self.name
    }

    fn metric(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Del => Some(self.del),
            Metric::Npa => Some(self.npa),
            _ => None,
        }
    }
}

/// One row of the HMDA origination-volume CSV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeRow {
    pub state_name: String,
    pub as_of_year: i32,
    pub count: f64,
}

impl Record for VolumeRow {
    fn name(&self) -> &str {
        &self.state_name
    }

    fn metric(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Count => Some(self.count),
            _ => None,
        }
    }
}

/// Closed numeric interval `[min, max]` over one column.
///
/// Only built from non-empty input, so `min <= max` and both are finite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Domain {
    pub min: f64,
    pub max: f64,
}

impl Domain {
    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    /// Smallest domain covering both.
    pub fn union(&self, other: &Domain) -> Domain {
        Domain {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }
}

/// Earliest/latest observation of a time series.
///
/// `min`/`max` hold the date strings as written in the source and are the endpoints callers
/// build axes from; the epoch fields only exist for comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeDomain {
    pub min: String,
    pub max: String,
    pub min_epoch_ms: i64,
    pub max_epoch_ms: i64,
}

/// Entity name -> single value, built by the aggregate join.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Lookup {
    pub values: HashMap<String, f64>,
    /// Names seen more than once; the last occurrence won.
    pub duplicates: Vec<String>,
}

impl Lookup {
    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Records grouped per entity.
///
/// Keys iterate in first-seen order; each group keeps input order.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesGroup<R> {
    keys: Vec<String>,
    groups: HashMap<String, Vec<R>>,
}

impl<R> Default for SeriesGroup<R> {
    fn default() -> Self {
        Self {
            keys: Vec::new(),
            groups: HashMap::new(),
        }
    }
}

impl<R> SeriesGroup<R> {
    /// Append `record` to the group for `key`, creating it on first encounter.
    pub fn push(&mut self, key: &str, record: R) {
        match self.groups.get_mut(key) {
            Some(group) => group.push(record),
            None => {
                self.keys.push(key.to_string());
                self.groups.insert(key.to_string(), vec![record]);
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&[R]> {
        self.groups.get(key).map(Vec::as_slice)
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[R])> + '_ {
        self.keys
            .iter()
            .filter_map(|k| self.groups.get(k).map(|g| (k.as_str(), g.as_slice())))
    }

    /// Number of groups.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Number of records across all groups.
    pub fn record_count(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }
}

/// Where a document comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSource {
    Path(PathBuf),
    Url(String),
}

impl DataSource {
    /// `http://` and `https://` inputs are URLs, everything else a local path.
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            DataSource::Url(trimmed.to_string())
        } else {
            DataSource::Path(PathBuf::from(trimmed))
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::Path(p) => write!(f, "{}", p.display()),
            DataSource::Url(u) => f.write_str(u),
        }
    }
}

/// Which geography the map widget shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MapMode {
    State,
    County,
}

impl MapMode {
    /// Toggle-button label.
    pub fn label(self) -> &'static str {
        match self {
            MapMode::State => "Map by State",
            MapMode::County => "Map by County",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            MapMode::State => MapMode::County,
            MapMode::County => MapMode::State,
        }
    }
}

/// Center + zoom of the map widget.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapView {
    pub center_lat: f64,
    pub center_lon: f64,
    pub zoom: u8,
}

/// U.S. mainland centroid used when a map is (re)built.
pub const DEFAULT_MAP_VIEW: MapView = MapView {
    center_lat: 37.00,
    center_lon: -96.90,
    zoom: 4,
};

pub const MIN_ZOOM: u8 = 1;
pub const MAX_ZOOM: u8 = 10;

impl MapView {
    /// Visible `(lon_bounds, lat_bounds)`.
    ///
    /// Longitude half-width is `360 / 2^zoom` degrees; latitude gets half of
    /// that, clamped to the valid range.
    pub fn bounds(&self) -> ([f64; 2], [f64; 2]) {
        let half_lon = 360.0 / f64::from(1u32 << self.zoom.clamp(MIN_ZOOM, MAX_ZOOM));
        let half_lat = half_lon / 2.0;
        let lon = [self.center_lon - half_lon, self.center_lon + half_lon];
        let lat = [
            (self.center_lat - half_lat).max(-90.0),
            (self.center_lat + half_lat).min(90.0),
        ];
        (lon, lat)
    }

    pub fn zoom_in(&mut self) {
        self.zoom = (self.zoom + 1).min(MAX_ZOOM);
    }

    pub fn zoom_out(&mut self) {
        self.zoom = self.zoom.saturating_sub(1).max(MIN_ZOOM);
    }
}

/// All input documents of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct Sources {
    pub geometry: DataSource,
    pub delinquency: DataSource,
    pub npa: DataSource,
    pub trends: DataSource,
    pub volume: Option<DataSource>,
    pub county_geometry: Option<DataSource>,
    pub county_table: Option<DataSource>,
}

/// Resolved configuration of one run, built from CLI args + environment.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub sources: Sources,
    /// Feature property holding the entity name; `None` tries `State`, `name`, `NAME`.
    pub name_property: Option<String>,
    /// Anchor the shared color scale at the max over both metrics instead of delinquency only.
    pub joint_scale: bool,
    /// Fixed upper bound of the trend y-axis.
    pub y_max: Option<f64>,
    /// Series to draw highlighted on the trend charts.
    pub highlight: Option<String>,
    pub out_dir: PathBuf,
    pub map_width: u32,
    pub map_height: u32,
    pub chart_width: u32,
    pub chart_height: u32,
    pub export: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_source_detects_urls() {
        assert_eq!(
            DataSource::parse("https://example.org/a.json"),
            DataSource::Url("https://example.org/a.json".to_string())
        );
        assert_eq!(
            DataSource::parse("./data/a.json"),
            DataSource::Path(PathBuf::from("./data/a.json"))
        );
    }

    #[test]
    fn series_group_keeps_first_seen_key_order() {
        let mut g = SeriesGroup::default();
        g.push("b", 1);
        g.push("a", 2);
        g.push("b", 3);
        assert_eq!(g.keys(), &["b".to_string(), "a".to_string()]);
        assert_eq!(g.get("b"), Some(&[1, 3][..]));
        assert_eq!(g.record_count(), 3);
    }

    #[test]
    fn default_view_covers_mainland() {
        let (lon, lat) = DEFAULT_MAP_VIEW.bounds();
        assert!(lon[0] < -119.0);
        assert!(lon[1] > -75.0);
        assert!(lat[0] < 26.0 && lat[1] > 48.0);
    }

    #[test]
    fn map_mode_toggles() {
        assert_eq!(MapMode::State.toggled(), MapMode::County);
        assert_eq!(MapMode::County.label(), "Map by County");
    }
}
