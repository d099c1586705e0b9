//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the property record schema (`PropertyRecord`, `Column`)
//! - the in-memory table used for training and inference (`Table`)
//! - run configuration for the offline pipeline (`PipelineConfig`)

pub mod types;

pub use types::*;
