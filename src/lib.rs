//! `propval` library crate.
//!
//! The binary (`propval`) is a thin wrapper around this library so that:
//!
//! - training, evaluation and serving are testable without spawning processes
//! - the HTTP service and the offline commands share one pipeline implementation

pub mod api;
pub mod app;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod fit;
pub mod inference;
pub mod io;
pub mod logging;
pub mod math;
pub mod models;
pub mod preprocess;
pub mod report;

#[cfg(test)]
mod testing;
