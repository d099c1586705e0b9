//! Input/output helpers.
//!
//! - CSV ingest + validation (`ingest`)
//! - SQL query loading (`db`)
//! - pipeline artifact read/write (`artifact`)
//! - prediction and metrics exports (`export`)

pub mod artifact;
pub mod db;
pub mod export;
pub mod ingest;

pub use artifact::*;
pub use db::*;
pub use export::*;
pub use ingest::*;
