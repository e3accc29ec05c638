//! Reporting: run summaries for the terminal.

mod format;

pub use format::*;
