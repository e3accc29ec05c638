//! Scales: value -> position and value -> color.
//!
//! - linear scale with an explicit domain/range (`linear`)
//! - Viridis ramp and threshold palette (`color`)

pub mod color;
pub mod linear;

pub use color::*;
pub use linear::*;
