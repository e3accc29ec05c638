//! Formatted terminal output for a run.
//!
//! Formatting lives in one place so output changes stay localized.

use std::path::PathBuf;

use crate::app::pipeline::{MapOutput, RunOutput, TrendOutput, VolumeOutput};
use crate::domain::{Domain, Lookup};
use crate::error::PipelineError;
use crate::transform::JoinCoverage;

const MAX_LISTED: usize = 8;

/// Format the full run summary (join stats, domains, trends, volume).
pub fn format_run_summary(run: &RunOutput, joint_scale: bool) -> String {
    let mut out = String::new();

    out.push_str("=== dmap - Mortgage Delinquency / NPA ===\n");
    out.push_str(&format_maps(&run.maps, joint_scale));

    out.push('\n');
    match &run.trends {
        Ok(trends) => out.push_str(&format_trends(trends)),
        Err(err) => out.push_str(&format!("Trends: unavailable ({err})\n")),
    }

    if let Some(volume) = &run.volume {
        out.push('\n');
        out.push_str(&format_volume(volume));
    }

    out
}

pub fn format_maps(maps: &MapOutput, joint_scale: bool) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Geometry: {} | features={}\n",
        maps.geometry.location,
        maps.geometry.features.len()
    ));
    out.push_str(&format_table_line("Delinquency", &maps.delinquency, &maps.del_domain, &maps.del_coverage));
    out.push_str(&format_table_line("NPA", &maps.npa, &maps.npa_domain, &maps.npa_coverage));

    let [lo, hi] = maps.color_scale.domain();
    let basis = if joint_scale { "max of both metrics" } else { "delinquency max" };
    out.push_str(&format!("Color scale: [{lo:.3}, {hi:.3}] -> Viridis (shared, {basis})\n"));

    for (label, lookup) in [("delinquency", &maps.delinquency), ("npa", &maps.npa)] {
        if !lookup.duplicates.is_empty() {
            out.push_str(&format!(
                "Duplicate {label} names (last value kept): {}\n",
                join_names(&lookup.duplicates)
            ));
        }
    }
    for (label, coverage) in [("delinquency", &maps.del_coverage), ("npa", &maps.npa_coverage)] {
        if !coverage.unmatched.is_empty() {
            out.push_str(&format!(
                "Features without {label} (no data): {}\n",
                join_names(&coverage.unmatched)
            ));
        }
    }
    out
}

fn format_table_line(label: &str, lookup: &Lookup, domain: &Domain, coverage: &JoinCoverage) -> String {
    format!(
        "{label:<12} entities={:<4} domain=[{:.3}, {:.3}] joined={}/{}\n",
        lookup.len(),
        domain.min,
        domain.max,
        coverage.matched,
        coverage.matched + coverage.unmatched.len(),
    )
}

pub fn format_trends(trends: &TrendOutput) -> String {
    format!(
        "Trends: rows={} series={} | {} .. {}\n  del=[{:.3}, {:.3}] npa=[{:.3}, {:.3}] | y-axis=[0, {:.3}]\n",
        trends.rows_read,
        trends.groups.len(),
        trends.time_domain.min,
        trends.time_domain.max,
        trends.del_domain.min,
        trends.del_domain.max,
        trends.npa_domain.min,
        trends.npa_domain.max,
        trends.y_max,
    )
}

pub fn format_volume(volume: &Result<VolumeOutput, PipelineError>) -> String {
    match volume {
        Ok(v) => {
            let mut out = format!(
                "Volume: rows={} states={} skipped={}\n",
                v.rows_read,
                v.lookup.len(),
                v.row_errors.len()
            );
            for e in v.row_errors.iter().take(MAX_LISTED) {
                out.push_str(&format!("  line {}: {}\n", e.line, truncate(&e.message, 72)));
            }
            out
        }
        Err(err) => format!("Volume: unavailable ({err})\n"),
    }
}

pub fn format_written(paths: &[PathBuf]) -> String {
    let mut out = String::from("Wrote:\n");
    for p in paths {
        out.push_str(&format!("  {}\n", p.display()));
    }
    out
}

fn join_names(names: &[String]) -> String {
    let mut sorted: Vec<&str> = names.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    let shown: Vec<String> = sorted.iter().take(MAX_LISTED).map(|n| truncate(n, 24)).collect();
    let mut out = shown.join(", ");
    if sorted.len() > MAX_LISTED {
        out.push_str(&format!(" (+{} more)", sorted.len() - MAX_LISTED));
    }
    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}
