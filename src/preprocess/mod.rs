//! Feature preprocessing.
//!
//! - per-column target encoding (`target_encoder`)
//! - the column transform that assembles the regressor input (`column_transform`)

pub mod column_transform;
pub mod target_encoder;

pub use column_transform::*;
pub use target_encoder::*;
