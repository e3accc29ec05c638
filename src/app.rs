//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments (and `.env`)
//! - installs logging
//! - runs the load/join pipeline
//! - writes SVG output, prints reports/plots, or starts the TUI

use clap::Parser;

use crate::cli::{Command, RenderArgs, ScaleArgs, SourceArgs, SummaryArgs, TrendsArgs, TuiArgs};
use crate::domain::{DataSource, RunConfig, Sources};
use crate::error::AppError;
use crate::logging::LogTarget;

pub mod pipeline;

/// Entry point for the `dmap` binary.
pub fn run() -> Result<(), AppError> {
    // A missing .env is fine; anything else in it should be visible.
    if let Err(err) = dotenvy::dotenv() {
        if !err.not_found() {
            return Err(AppError::new(2, format!("Failed to read .env: {err}")));
        }
    }

    // `dmap` and `dmap --mode county` behave like `dmap tui ...`.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    match cli.command {
        Command::Render(args) => {
            crate::logging::init(cli.verbose, LogTarget::Stderr)?;
            handle_render(args)
        }
        Command::Summary(args) => {
            crate::logging::init(cli.verbose, LogTarget::Stderr)?;
            handle_summary(args)
        }
        Command::Trends(args) => {
            crate::logging::init(cli.verbose, LogTarget::Stderr)?;
            handle_trends(args)
        }
        Command::Tui(args) => {
            let target = match &args.log_file {
                Some(path) => LogTarget::File(path),
                None => LogTarget::Discard,
            };
            crate::logging::init(cli.verbose, target)?;
            handle_tui(args)
        }
    }
}

fn handle_render(args: RenderArgs) -> Result<(), AppError> {
    let mut config = run_config_from_args(&args.sources, &args.scale);
    config.out_dir = args.out_dir.clone();
    config.map_width = args.map_width;
    config.map_height = args.map_height;
    config.chart_width = args.chart_width;
    config.chart_height = args.chart_height;
    config.export = args.export.clone();

    let run = pipeline::run(&config)?;
    let written = crate::render::render_all(&config, &run)?;

    println!("{}", crate::report::format_run_summary(&run, config.joint_scale));
    if let Some(path) = &config.export {
        crate::io::export::write_join_csv(path, &run.maps)?;
    }
    println!("{}", crate::report::format_written(&written));
    Ok(())
}

fn handle_summary(args: SummaryArgs) -> Result<(), AppError> {
    let mut config = run_config_from_args(&args.sources, &args.scale);
    config.export = args.export.clone();

    let run = pipeline::run(&config)?;
    println!("{}", crate::report::format_run_summary(&run, config.joint_scale));

    if let Some(path) = &config.export {
        crate::io::export::write_join_csv(path, &run.maps)?;
    }
    Ok(())
}

fn handle_trends(args: TrendsArgs) -> Result<(), AppError> {
    let config = run_config_from_args(&args.sources, &args.scale);
    let fetcher = crate::io::fetch::Fetcher::new()?;
    let trends = pipeline::load_trends(&fetcher, &config.sources.trends, config.y_max)?;

    let plot = crate::plot::render_ascii_trends(
        &trends,
        args.metric,
        config.highlight.as_deref(),
        args.width,
        args.height,
    );
    println!("{}", args.metric.title());
    println!("{plot}");
    Ok(())
}

fn handle_tui(args: TuiArgs) -> Result<(), AppError> {
    let config = run_config_from_args(&args.sources, &args.scale);
    crate::tui::run(config, args.mode)
}

/// Resolve CLI/env arguments into a [`RunConfig`] with default output settings.
pub fn run_config_from_args(sources: &SourceArgs, scale: &ScaleArgs) -> RunConfig {
    RunConfig {
        sources: Sources {
            geometry: DataSource::parse(&sources.geometry),
            delinquency: DataSource::parse(&sources.delinquency),
            npa: DataSource::parse(&sources.npa),
            trends: DataSource::parse(&sources.trends),
            volume: sources.volume.as_deref().map(DataSource::parse),
            county_geometry: sources.county_geometry.as_deref().map(DataSource::parse),
            county_table: sources.county_table.as_deref().map(DataSource::parse),
        },
        name_property: sources.name_property.clone(),
        joint_scale: scale.joint_scale,
        y_max: scale.y_max,
        highlight: scale.highlight.clone(),
        out_dir: "out".into(),
        map_width: 960,
        map_height: 600,
        chart_width: 800,
        chart_height: 400,
        export: None,
    }
}

/// Rewrite argv so `dmap` defaults to `dmap tui`.
///
/// Rules:
/// - `dmap`                       -> `dmap tui`
/// - `dmap --mode county ...`     -> `dmap tui --mode county ...`
/// - `dmap --help/--version/-h`   -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("tui".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(arg1.as_str(), "-h" | "--help" | "-V" | "--version" | "help");
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "render" | "summary" | "trends" | "tui");
    if is_subcommand {
        return argv;
    }

    // If the first token is a flag, treat it as "tui flags".
    if arg1.starts_with('-') {
        argv.insert(1, "tui".to_string());
        return argv;
    }

    argv
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_invocation_starts_tui() {
        assert_eq!(rewrite_args(args(&["dmap"])), args(&["dmap", "tui"]));
        assert_eq!(
            rewrite_args(args(&["dmap", "--mode", "county"])),
            args(&["dmap", "tui", "--mode", "county"])
        );
    }

    #[test]
    fn subcommands_and_help_pass_through() {
        assert_eq!(rewrite_args(args(&["dmap", "render"])), args(&["dmap", "render"]));
        assert_eq!(rewrite_args(args(&["dmap", "--help"])), args(&["dmap", "--help"]));
    }

    #[test]
    fn config_resolves_urls_and_paths() {
        let cli = crate::cli::Cli::parse_from([
            "dmap",
            "summary",
            "--geometry",
            "https://example.org/us.geojson",
            "--npa",
            "npa.json",
            "--joint-scale",
        ]);
        let Command::Summary(s) = cli.command else {
            panic!("expected summary");
        };
        let config = run_config_from_args(&s.sources, &s.scale);
        assert_eq!(
            config.sources.geometry,
            DataSource::Url("https://example.org/us.geojson".to_string())
        );
        assert_eq!(config.sources.npa, DataSource::Path("npa.json".into()));
        assert!(config.joint_scale);
        assert!(config.sources.volume.is_none());
    }
}
