//! Input/output helpers.
//!
//! - fetching documents from paths/URLs, in parallel when joined (`fetch`)
//! - JSON/CSV ingest + validation into typed rows (`ingest`)
//! - GeoJSON feature extraction (`geometry`)
//! - joined-table CSV export (`export`)

pub mod export;
pub mod fetch;
pub mod geometry;
pub mod ingest;

pub use export::*;
pub use fetch::*;
pub use geometry::*;
pub use ingest::*;
