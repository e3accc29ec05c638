//! `delinquency-maps` library crate.
//!
//! The binary (`dmap`) is a thin wrapper around this library so that:
//!
//! - the load/join/scale pipeline is testable without spawning processes
//! - every front-end (SVG, ASCII, TUI) shares the same transforms
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod domain;
pub mod error;
pub mod io;
pub mod logging;
pub mod plot;
pub mod render;
pub mod report;
pub mod scale;
pub mod transform;
pub mod tui;
