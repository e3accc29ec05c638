//! Shared load -> join -> scale pipeline used by the CLI, the ASCII plot and
//! the TUI.
//!
//! Keeping this in one place means every chart is fed by the same two
//! transforms:
//! geometry + tables -> lookups + color domain (maps)
//! time series -> groups + time/value domains (trends)
//!
//! Front-ends only decide how to present the outputs.

use serde_json::Value;

use crate::domain::{
    AggregateRow, DataSource, Domain, Lookup, MapMode, Metric, RunConfig, SeriesGroup, TimeDomain, TimedRow,
};
use crate::error::PipelineError;
use crate::io::fetch::Fetcher;
use crate::io::geometry::{GeometryLayer, parse_geometry};
use crate::io::ingest::{RowError, parse_aggregate_rows, parse_observation_date, parse_timed_rows, parse_volume_csv};
use crate::scale::{ColorScale, StepScale};
use crate::transform::{JoinCoverage, build_lookup, compute_domain, group_by, join_coverage, time_domain, value_domain};

/// Everything the two state choropleths need.
#[derive(Debug, Clone)]
pub struct MapOutput {
    pub geometry: GeometryLayer,
    pub delinquency: Lookup,
    pub npa: Lookup,
    pub del_domain: Domain,
    pub npa_domain: Domain,
    /// Shared by both maps so equal colors mean equal rates.
    pub color_scale: ColorScale,
    pub del_coverage: JoinCoverage,
    pub npa_coverage: JoinCoverage,
}

/// Everything the trend charts need.
#[derive(Debug, Clone)]
pub struct TrendOutput {
    pub rows_read: usize,
    pub groups: SeriesGroup<TimedRow>,
    pub time_domain: TimeDomain,
    pub del_domain: Domain,
    pub npa_domain: Domain,
    /// `[start, end]` of the x axis in epoch milliseconds, from the domain strings.
    pub x_bounds_ms: [i64; 2],
    /// Upper bound of the shared `[0, y_max]` y axis.
    pub y_max: f64,
}

impl TrendOutput {
    pub fn domain_for(&self, metric: Metric) -> Option<&Domain> {
        match metric {
            Metric::Del => Some(&self.del_domain),
            Metric::Npa => Some(&self.npa_domain),
            _ => None,
        }
    }
}

/// HMDA mortgage volume joined by state name.
#[derive(Debug, Clone)]
pub struct VolumeOutput {
    pub lookup: Lookup,
    pub scale: StepScale,
    pub rows_read: usize,
    pub row_errors: Vec<RowError>,
}

/// One layer of the interactive map widget.
#[derive(Debug, Clone)]
pub struct MapLayer {
    pub mode: MapMode,
    pub geometry: GeometryLayer,
    /// `None` when the layer has no table joined to it.
    pub values: Option<(Lookup, ColorScale)>,
}

impl MapLayer {
    pub fn from_state_maps(maps: &MapOutput) -> Self {
        Self {
            mode: MapMode::State,
            geometry: maps.geometry.clone(),
            values: Some((maps.delinquency.clone(), maps.color_scale)),
        }
    }
}

/// All outputs of one `dmap render` / `dmap summary` pass.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub maps: MapOutput,
    /// Loaded independently; its failure does not cancel the maps.
    pub trends: Result<TrendOutput, PipelineError>,
    pub volume: Option<Result<VolumeOutput, PipelineError>>,
}

/// Execute the full pipeline.
///
/// The map documents are a single all-or-nothing join; trends and volume
/// are separate loads whose errors are kept on the output.
pub fn run(config: &RunConfig) -> Result<RunOutput, PipelineError> {
    let fetcher = Fetcher::new()?;

    let maps = load_maps(&fetcher, config)?;

    let trends = load_trends(&fetcher, &config.sources.trends, config.y_max);
    if let Err(err) = &trends {
        tracing::error!(error = %err, "trend data unavailable");
    }

    let volume = config.sources.volume.as_ref().map(|source| {
        let out = load_volume(&fetcher, source);
        if let Err(err) = &out {
            tracing::error!(error = %err, "volume data unavailable");
        }
        out
    });

    Ok(RunOutput { maps, trends, volume })
}

/// Fetch geometry + both tables in parallel, then join.
pub fn load_maps(fetcher: &Fetcher, config: &RunConfig) -> Result<MapOutput, PipelineError> {
    let sources = &config.sources;
    let docs = fetcher.fetch_all_text(&[&sources.geometry, &sources.delinquency, &sources.npa])?;
    let [geometry_text, del_text, npa_text]: [String; 3] = docs
        .try_into()
        .map_err(|_| PipelineError::data_load("map inputs", "expected three documents"))?;

    let geometry = parse_geometry(
        &geometry_text,
        &sources.geometry.to_string(),
        config.name_property.as_deref(),
    )?;
    let del_rows = parse_aggregate_rows(&parse_json(&del_text, &sources.delinquency)?, &sources.delinquency.to_string())?;
    let npa_rows = parse_aggregate_rows(&parse_json(&npa_text, &sources.npa)?, &sources.npa.to_string())?;

    build_maps(geometry, &del_rows, &npa_rows, config.joint_scale)
}

/// Join both tables onto `geometry` and derive the shared color scale.
pub fn build_maps(
    geometry: GeometryLayer,
    del_rows: &[AggregateRow],
    npa_rows: &[AggregateRow],
    joint_scale: bool,
) -> Result<MapOutput, PipelineError> {
    let del_domain = compute_domain(del_rows, Metric::MeanDel)?;
    let npa_domain = compute_domain(npa_rows, Metric::MeanNpa)?;

    let delinquency = build_lookup(del_rows, Metric::MeanDel)?;
    let npa = build_lookup(npa_rows, Metric::MeanNpa)?;

    let scale_domain = if joint_scale {
        del_domain.union(&npa_domain)
    } else {
        del_domain
    };
    let color_scale = ColorScale::zero_anchored(&scale_domain);

    let del_coverage = join_coverage(geometry.names(), &delinquency);
    let npa_coverage = join_coverage(geometry.names(), &npa);
    for (metric, coverage) in [(Metric::MeanDel, &del_coverage), (Metric::MeanNpa, &npa_coverage)] {
        if !coverage.unmatched.is_empty() {
            tracing::warn!(
                metric = %metric,
                unmatched = coverage.unmatched.len(),
                "features without a joined value will render as no-data"
            );
        }
    }

    tracing::info!(
        features = geometry.features.len(),
        del_entities = delinquency.len(),
        npa_entities = npa.len(),
        scale_max = scale_domain.max,
        "joined map tables"
    );

    Ok(MapOutput {
        geometry,
        delinquency,
        npa,
        del_domain,
        npa_domain,
        color_scale,
        del_coverage,
        npa_coverage,
    })
}

/// Fetch and group the time series.
pub fn load_trends(fetcher: &Fetcher, source: &DataSource, y_max: Option<f64>) -> Result<TrendOutput, PipelineError> {
    let doc = fetcher.fetch_json(source)?;
    let rows = parse_timed_rows(&doc, &source.to_string())?;
    build_trends(&rows, y_max)
}

/// Group `rows` per entity and compute the axis domains.
///
/// Both trend charts share `[0, y_max]`, where `y_max` defaults to the
/// larger of the `del` and `npa` maxima.
pub fn build_trends(rows: &[TimedRow], y_max: Option<f64>) -> Result<TrendOutput, PipelineError> {
    let time_domain = time_domain(rows)?;
    let del_domain = value_domain(rows, Metric::Del)?;
    let npa_domain = value_domain(rows, Metric::Npa)?;
    let groups = group_by(rows, |r| r.name.as_str());

    let start = parse_observation_date(&time_domain.min)
        .map_err(|_| PipelineError::invalid_record("date", time_domain.min.clone()))?;
    let end = parse_observation_date(&time_domain.max)
        .map_err(|_| PipelineError::invalid_record("date", time_domain.max.clone()))?;
    let x_bounds_ms = [start.and_utc().timestamp_millis(), end.and_utc().timestamp_millis()];

    let observed_max = del_domain.union(&npa_domain).max;
    let y_max = match y_max {
        Some(v) if v.is_finite() && v > 0.0 => v,
        _ if observed_max > 0.0 => observed_max,
        _ => 1.0,
    };

    tracing::info!(
        rows = rows.len(),
        series = groups.len(),
        start = %time_domain.min,
        end = %time_domain.max,
        y_max,
        "grouped time series"
    );

    Ok(TrendOutput {
        rows_read: rows.len(),
        groups,
        time_domain,
        del_domain,
        npa_domain,
        x_bounds_ms,
        y_max,
    })
}

/// Fetch the HMDA CSV and join counts by state name.
pub fn load_volume(fetcher: &Fetcher, source: &DataSource) -> Result<VolumeOutput, PipelineError> {
    let text = fetcher.fetch_text(source)?;
    let ingest = parse_volume_csv(&text, &source.to_string())?;
    if ingest.rows.is_empty() {
        return Err(PipelineError::empty(source.to_string()));
    }
    let lookup = build_lookup(&ingest.rows, Metric::Count)?;
    Ok(VolumeOutput {
        lookup,
        scale: StepScale::volume(),
        rows_read: ingest.rows_read,
        row_errors: ingest.row_errors,
    })
}

/// Fetch one map-widget layer: geometry plus an optional table, in parallel.
pub fn load_layer(
    fetcher: &Fetcher,
    mode: MapMode,
    geometry: &DataSource,
    table: Option<&DataSource>,
    metric: Metric,
    name_property: Option<&str>,
) -> Result<MapLayer, PipelineError> {
    let mut sources = vec![geometry];
    sources.extend(table);
    let mut docs = fetcher.fetch_all_text(&sources)?.into_iter();

    let geometry_text = docs
        .next()
        .ok_or_else(|| PipelineError::data_load(geometry.to_string(), "no document"))?;
    let layer_geometry = parse_geometry(&geometry_text, &geometry.to_string(), name_property)?;

    let values = match (table, docs.next()) {
        (Some(source), Some(text)) => {
            let rows = parse_aggregate_rows(&parse_json(&text, source)?, &source.to_string())?;
            let domain = compute_domain(&rows, metric)?;
            let lookup = build_lookup(&rows, metric)?;
            Some((lookup, ColorScale::zero_anchored(&domain)))
        }
        _ => None,
    };

    Ok(MapLayer {
        mode,
        geometry: layer_geometry,
        values,
    })
}

fn parse_json(text: &str, source: &DataSource) -> Result<Value, PipelineError> {
    serde_json::from_str(text).map_err(|e| PipelineError::data_load(source.to_string(), format!("invalid JSON: {e}")))
}
