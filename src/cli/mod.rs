//! Command-line parsing for the delinquency map renderer.
//!
//! Argument parsing and command dispatch stay separate from the
//! load/join/render code; every input can also come from a `DMAP_*`
//! environment variable (or `.env`).

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{MapMode, TrendMetric};

/// Default contiguous-USA state outlines.
pub const DEFAULT_GEOMETRY: &str =
    "https://raw.githubusercontent.com/ResidentMario/geoplot-data/master/contiguous-usa.geojson";

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "dmap",
    version,
    about = "U.S. mortgage delinquency and NPA choropleths and trend charts"
)]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). `RUST_LOG` overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Write both state maps and both trend charts as SVG, then print a summary.
    Render(RenderArgs),
    /// Print domains, lookup sizes and join coverage; optionally export the join.
    Summary(SummaryArgs),
    /// Plot all series of one trend metric in the terminal.
    Trends(TrendsArgs),
    /// Launch the interactive TUI (default when no subcommand is given).
    Tui(TuiArgs),
}

/// Input documents shared by every command.
#[derive(Debug, Args, Clone)]
pub struct SourceArgs {
    /// State geometry (GeoJSON path or URL).
    #[arg(long, env = "DMAP_GEOMETRY", default_value = DEFAULT_GEOMETRY)]
    pub geometry: String,

    /// Per-state delinquency table (JSON array with `Name`, `mean_del`).
    #[arg(long, env = "DMAP_DELINQUENCY", default_value = "./data/yoy_del_rates_state.json")]
    pub delinquency: String,

    /// Per-state NPA table (JSON array with `Name`, `mean_npa`).
    #[arg(long, env = "DMAP_NPA", default_value = "./data/yoy_npa_rates_state.json")]
    pub npa: String,

    /// Dated per-state series (JSON array with `Name`, `date`, `del`, `npa`).
    #[arg(long, env = "DMAP_TRENDS", default_value = "./data/perf_trends_by_state.json")]
    pub trends: String,

    /// HMDA mortgage volume CSV (`count`, `as_of_year`, `state_name`).
    #[arg(long, env = "DMAP_VOLUME")]
    pub volume: Option<String>,

    /// County geometry for the county map mode.
    #[arg(long, env = "DMAP_COUNTY_GEOMETRY")]
    pub county_geometry: Option<String>,

    /// County table joined onto the county geometry.
    #[arg(long, env = "DMAP_COUNTY_TABLE")]
    pub county_table: Option<String>,

    /// Feature property holding the entity name (default: State, name, NAME).
    #[arg(long, env = "DMAP_NAME_PROPERTY")]
    pub name_property: Option<String>,
}

/// Scale options shared by map and chart output.
#[derive(Debug, Args, Clone)]
pub struct ScaleArgs {
    /// Anchor the shared color scale at the max of both metrics.
    #[arg(long)]
    pub joint_scale: bool,

    /// Fixed upper bound of the trend y-axis (default: max of del and npa).
    #[arg(long)]
    pub y_max: Option<f64>,

    /// Series to highlight on the trend charts.
    #[arg(long)]
    pub highlight: Option<String>,
}

#[derive(Debug, Args, Clone)]
pub struct RenderArgs {
    #[command(flatten)]
    pub sources: SourceArgs,

    #[command(flatten)]
    pub scale: ScaleArgs,

    /// Output directory for the SVG files.
    #[arg(long, env = "DMAP_OUT_DIR", default_value = "out")]
    pub out_dir: PathBuf,

    /// Map width (pixels).
    #[arg(long, default_value_t = 960)]
    pub map_width: u32,

    /// Map height (pixels).
    #[arg(long, default_value_t = 600)]
    pub map_height: u32,

    /// Trend chart width (pixels).
    #[arg(long, default_value_t = 800)]
    pub chart_width: u32,

    /// Trend chart height (pixels).
    #[arg(long, default_value_t = 400)]
    pub chart_height: u32,

    /// Also export the joined state table to CSV.
    #[arg(long)]
    pub export: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct SummaryArgs {
    #[command(flatten)]
    pub sources: SourceArgs,

    #[command(flatten)]
    pub scale: ScaleArgs,

    /// Export the joined state table to CSV.
    #[arg(long)]
    pub export: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct TrendsArgs {
    #[command(flatten)]
    pub sources: SourceArgs,

    #[command(flatten)]
    pub scale: ScaleArgs,

    /// Which rate to plot.
    #[arg(long, value_enum, default_value_t = TrendMetric::Del)]
    pub metric: TrendMetric,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,
}

#[derive(Debug, Args, Clone)]
pub struct TuiArgs {
    #[command(flatten)]
    pub sources: SourceArgs,

    #[command(flatten)]
    pub scale: ScaleArgs,

    /// Map shown on start.
    #[arg(long, value_enum, default_value_t = MapMode::State)]
    pub mode: MapMode,

    /// Write logs here while the TUI owns the terminal (otherwise discarded).
    #[arg(long, env = "DMAP_LOG_FILE")]
    pub log_file: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trends_subcommand_parses_metric_and_highlight() {
        let cli = Cli::parse_from(["dmap", "trends", "--metric", "npa", "--highlight", "Ohio"]);
        let Command::Trends(args) = cli.command else {
            panic!("expected trends");
        };
        assert_eq!(args.metric, TrendMetric::Npa);
        assert_eq!(args.scale.highlight.as_deref(), Some("Ohio"));
        assert_eq!(args.width, 100);
    }

    #[test]
    fn verbose_is_global() {
        let cli = Cli::parse_from(["dmap", "summary", "-vv"]);
        assert_eq!(cli.verbose, 2);
    }
}
