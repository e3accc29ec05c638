//! Ratatui-based terminal UI.
//!
//! Layout: the state/county map on the left, both trend charts on the right,
//! a status line at the bottom. Hovering a series highlights it on both
//! charts and shows a "Hello {name}" tooltip.

use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
};

use crate::app::pipeline::{self, MapLayer, MapOutput, TrendOutput};
use crate::domain::{MapMode, Metric, RunConfig, TrendMetric};
use crate::error::{AppError, PipelineError};
use crate::io::fetch::Fetcher;

mod map_widget;
mod plotters_chart;

use map_widget::{MapHandle, cycle, destroy_map, rebuild_map};
use plotters_chart::{TrendPlottersChart, TrendSeries};

/// Start the TUI.
pub fn run(config: RunConfig, initial_mode: MapMode) -> Result<(), AppError> {
    let fetcher = Fetcher::new()?;
    let mut app = App::load(config, fetcher, initial_mode);

    let _guard = TerminalGuard::new()?;
    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)
        .map_err(|e| AppError::new(4, format!("Failed to initialize terminal: {e}")))?;

    let result = app.event_loop(&mut terminal);
    if let Some(handle) = app.map.take() {
        destroy_map(handle);
    }
    result
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::new(4, format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::new(4, format!("Failed to enter alternate screen: {e}")));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

struct App {
    config: RunConfig,
    fetcher: Fetcher,
    maps: Result<MapOutput, PipelineError>,
    trends: Option<TrendOutput>,
    panels: Vec<TrendSeries>,
    map: Option<MapHandle>,
    /// Index of the hovered series in `panels[*].keys`.
    hover: Option<usize>,
    status: String,
}

impl App {
    /// Load every input; failures end up in the status line, not as an error.
    fn load(config: RunConfig, fetcher: Fetcher, mode: MapMode) -> Self {
        let maps = pipeline::load_maps(&fetcher, &config);
        let trends = pipeline::load_trends(&fetcher, &config.sources.trends, config.y_max);
        Self::from_outputs(config, fetcher, maps, trends, mode)
    }

    fn from_outputs(
        config: RunConfig,
        fetcher: Fetcher,
        maps: Result<MapOutput, PipelineError>,
        trends: Result<TrendOutput, PipelineError>,
        mode: MapMode,
    ) -> Self {
        let mut status = Vec::new();
        if let Err(err) = &maps {
            status.push(format!("maps: {err}"));
        }
        let (trends, panels) = match trends {
            Ok(t) => {
                let panels = TrendMetric::ALL
                    .iter()
                    .map(|m| TrendSeries::from_trends(&t, *m))
                    .collect::<Vec<_>>();
                (Some(t), panels)
            }
            Err(err) => {
                status.push(format!("trends: {err}"));
                (None, Vec::new())
            }
        };

        let hover = config
            .highlight
            .as_deref()
            .and_then(|name| panels.first().and_then(|p| p.keys.iter().position(|k| k == name)));

        let mut app = Self {
            config,
            fetcher,
            maps,
            trends,
            panels,
            map: None,
            hover,
            status: String::new(),
        };
        app.switch_map(mode);
        if !status.is_empty() {
            app.status = status.join(" | ");
        }
        app
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::new(4, format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100))
                .map_err(|e| AppError::new(4, format!("Event poll error: {e}")))?
            {
                continue;
            }

            match event::read().map_err(|e| AppError::new(4, format!("Event read error: {e}")))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key.code) {
                        break;
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => {
                    needs_redraw = true;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Returns `true` when the app should quit.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char('q') => return true,
            KeyCode::Up => self.hover_series(false),
            KeyCode::Down => self.hover_series(true),
            KeyCode::Left => self.with_map(|m| m.hover_step(false)),
            KeyCode::Right => self.with_map(|m| m.hover_step(true)),
            KeyCode::Esc => {
                self.hover = None;
                self.with_map(MapHandle::clear_hover);
            }
            KeyCode::Char('s') => self.switch_map(MapMode::State),
            KeyCode::Char('c') => self.switch_map(MapMode::County),
            KeyCode::Char('m') => {
                let next = self.map.as_ref().map(|m| m.mode().toggled()).unwrap_or(MapMode::State);
                self.switch_map(next);
            }
            KeyCode::Char('+') | KeyCode::Char('=') => self.with_map(MapHandle::zoom_in),
            KeyCode::Char('-') => self.with_map(MapHandle::zoom_out),
            _ => {}
        }
        false
    }

    fn with_map(&mut self, f: impl FnOnce(&mut MapHandle)) {
        if let Some(map) = self.map.as_mut() {
            f(map);
        }
    }

    fn hover_series(&mut self, forward: bool) {
        let len = self.panels.first().map(|p| p.keys.len()).unwrap_or(0);
        self.hover = cycle(self.hover, len, forward);
    }

    fn hovered_series(&self) -> Option<&str> {
        let i = self.hover?;
        self.panels.first()?.keys.get(i).map(String::as_str)
    }

    /// Tear down the current map and build `mode` in its place.
    fn switch_map(&mut self, mode: MapMode) {
        let result = {
            let maps = &self.maps;
            let fetcher = &self.fetcher;
            let config = &self.config;
            rebuild_map(&mut self.map, || build_layer(mode, maps, fetcher, config))
        };
        self.status = match result {
            Ok(()) => format!("{} ready", mode.label()),
            Err(err) => {
                tracing::error!(error = %err, mode = ?mode, "map rebuild failed");
                format!("{} failed: {err}", mode.label())
            }
        };
    }

    fn draw(&mut self, frame: &mut ratatui::Frame<'_>) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(0), Constraint::Length(3)])
            .split(frame.area());

        self.draw_header(frame, chunks[0]);
        self.draw_body(frame, chunks[1]);
        self.draw_footer(frame, chunks[2]);
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let mode = self.map.as_ref().map(|m| m.mode().label()).unwrap_or("no map");
        let period = self
            .trends
            .as_ref()
            .map(|t| format!("{} .. {}", t.time_domain.min, t.time_domain.max))
            .unwrap_or_else(|| "-".to_string());
        let line = Line::from(vec![
            Span::styled("dmap", Style::default().fg(Color::Cyan)),
            Span::raw(format!(" | {mode} | trends {period}")),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_body(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
            .split(area);

        match &self.map {
            Some(map) => frame.render_widget(map.widget(), cols[0]),
            None => {
                let msg = Paragraph::new("Map unavailable (see status line).")
                    .style(Style::default().fg(Color::Yellow))
                    .block(Block::default().title("Map").borders(Borders::ALL));
                frame.render_widget(msg, cols[0]);
            }
        }

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(cols[1]);
        for (i, metric) in TrendMetric::ALL.iter().enumerate() {
            self.draw_trend(frame, rows[i], *metric);
        }
    }

    fn draw_trend(&self, frame: &mut ratatui::Frame<'_>, area: Rect, metric: TrendMetric) {
        let mut title = metric.title().to_string();
        if let Some(name) = self.hovered_series() {
            title = format!("{title} [{name}]");
        }
        let block = Block::default().title(title).borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        frame.render_widget(Clear, inner);

        let Some(series) = self.panels.iter().find(|p| p.metric == metric) else {
            let msg = Paragraph::new("Trend data unavailable.").style(Style::default().fg(Color::Yellow));
            frame.render_widget(msg, inner);
            return;
        };

        frame.render_widget(
            TrendPlottersChart {
                series,
                highlight: self.hover,
            },
            inner,
        );

        if let Some(name) = self.hovered_series() {
            let text = tooltip_text(name);
            let width = (text.chars().count() as u16 + 2).min(inner.width);
            let rect = Rect {
                x: inner.x + inner.width.saturating_sub(width),
                y: inner.y,
                width,
                height: 1.min(inner.height),
            };
            frame.render_widget(Clear, rect);
            frame.render_widget(
                Paragraph::new(format!(" {text}"))
                    .style(Style::default().fg(Color::Black).bg(Color::White).add_modifier(Modifier::BOLD)),
                rect,
            );
        }
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = "↑/↓ series  ←/→ region  Esc clear  s/c/m map  +/- zoom  q quit";
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(&self.status, Style::default().fg(Color::Yellow)),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

fn tooltip_text(name: &str) -> String {
    format!("Hello {name}")
}

/// Build the layer for `mode` from already-joined state maps or fresh county inputs.
fn build_layer(
    mode: MapMode,
    maps: &Result<MapOutput, PipelineError>,
    fetcher: &Fetcher,
    config: &RunConfig,
) -> Result<MapLayer, PipelineError> {
    match mode {
        MapMode::State => maps.as_ref().map(MapLayer::from_state_maps).map_err(Clone::clone),
        MapMode::County => {
            let geometry = config
                .sources
                .county_geometry
                .as_ref()
                .ok_or_else(|| PipelineError::data_load("county geometry", "not configured (pass --county-geometry)"))?;
            pipeline::load_layer(
                fetcher,
                MapMode::County,
                geometry,
                config.sources.county_table.as_ref(),
                Metric::MeanDel,
                config.name_property.as_deref(),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::domain::{AggregateRow, DataSource, Sources};
    use crate::io::geometry::{GeometryFeature, GeometryLayer};
    use crate::io::ingest::parse_timed_rows;

    fn config(highlight: Option<&str>) -> RunConfig {
        let path = |name: &str| DataSource::Path(name.into());
        RunConfig {
            sources: Sources {
                geometry: path("states.geojson"),
                delinquency: path("del.json"),
                npa: path("npa.json"),
                trends: path("trends.json"),
                volume: None,
                county_geometry: None,
                county_table: None,
            },
            name_property: None,
            joint_scale: false,
            y_max: None,
            highlight: highlight.map(str::to_string),
            out_dir: "out".into(),
            map_width: 960,
            map_height: 600,
            chart_width: 800,
            chart_height: 400,
            export: None,
        }
    }

    fn app(highlight: Option<&str>) -> App {
        let features = ["Texas", "Maine"]
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
        let geometry = GeometryLayer {
            location: "states.geojson".to_string(),
            features,
        };
        let rows = vec![
            AggregateRow {
                name: "Texas".to_string(),
                mean_del: Some(2.0),
                mean_npa: Some(1.0),
            },
            AggregateRow {
                name: "Maine".to_string(),
                mean_del: Some(4.0),
                mean_npa: Some(3.0),
            },
        ];
        let maps = pipeline::build_maps(geometry, &rows, &rows, false);

        let doc = serde_json::json!([
            {"Name": "Texas", "date": "2017-01-01", "del": 2.0, "npa": 1.0},
            {"Name": "Maine", "date": "2017-01-01", "del": 1.0, "npa": 3.0},
        ]);
        let trends = pipeline::build_trends(&parse_timed_rows(&doc, "trends.json").unwrap(), None);

        App::from_outputs(config(highlight), Fetcher::new().unwrap(), maps, trends, MapMode::State)
    }

    #[test]
    fn tooltip_greets_hovered_series() {
        assert_eq!(tooltip_text("Ohio"), "Hello Ohio");
    }

    #[test]
    fn highlight_flag_preselects_series() {
        assert_eq!(app(Some("Maine")).hovered_series(), Some("Maine"));
        assert_eq!(app(Some("Nowhere")).hovered_series(), None);
    }

    #[test]
    fn escape_clears_series_and_region_hover() {
        let mut app = app(None);
        assert!(!app.handle_key(KeyCode::Down));
        assert_eq!(app.hovered_series(), Some("Texas"));
        app.handle_key(KeyCode::Right);
        assert_eq!(app.map.as_ref().unwrap().hovered_name(), Some("Texas"));

        app.handle_key(KeyCode::Esc);
        assert_eq!(app.hovered_series(), None);
        assert_eq!(app.map.as_ref().unwrap().hovered_name(), None);
    }

    #[test]
    fn failed_county_switch_keeps_state_map() {
        let mut app = app(None);
        assert_eq!(app.status, "Map by State ready");

        app.handle_key(KeyCode::Char('m'));
        assert_eq!(app.map.as_ref().unwrap().mode(), MapMode::State);
        assert!(app.status.starts_with("Map by County failed"), "{}", app.status);

        app.handle_key(KeyCode::Char('s'));
        assert_eq!(app.status, "Map by State ready");
        assert!(app.handle_key(KeyCode::Char('q')));
    }
}
