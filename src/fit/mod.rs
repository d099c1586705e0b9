//! Model training orchestration.
//!
//! Responsibilities:
//!
//! - compose preprocessing + regressor into a pipeline
//! - fit it on the training table
//! - persist the fitted pipeline

pub mod pipeline;
pub mod trainer;

pub use pipeline::*;
pub use trainer::*;
