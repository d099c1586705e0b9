//! Mathematical utilities.

pub mod stats;

pub use stats::*;
