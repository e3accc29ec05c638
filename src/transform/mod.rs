//! Pure transforms from typed records to the shapes renderers bind to.
//!
//! - aggregate join: name -> value lookups + color domain (`aggregate`)
//! - time-series grouping: per-entity series + time/value domains (`series`)
//! - the shared min/max fold (`fold`)

pub mod aggregate;
pub mod fold;
pub mod series;

pub use aggregate::*;
pub use fold::*;
pub use series::*;
