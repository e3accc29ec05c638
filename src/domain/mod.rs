//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the metric columns and typed records (`Metric`, `AggregateRow`, `TimedRow`, `VolumeRow`)
//! - transform outputs (`Domain`, `TimeDomain`, `Lookup`, `SeriesGroup`)
//! - run configuration (`DataSource`, `Sources`, `RunConfig`, `MapMode`, `MapView`)

pub mod types;

pub use types::*;
