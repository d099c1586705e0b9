//! Gradient-boosted regression trees.
//!
//! - hyperparameters and loss functions (`params`)
//! - the CART base learner (`tree`)
//! - the stagewise ensemble (`gbr`)

pub mod gbr;
pub mod params;
pub mod tree;

pub use gbr::*;
pub use params::*;
pub use tree::*;
