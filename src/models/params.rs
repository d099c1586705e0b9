//! Hyperparameters for the gradient-boosting regressor.
//!
//! Defaults follow the conventional gradient-boosting settings
//! (100 depth-3 trees, learning rate 0.1, squared error, no subsampling).

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::math::{mean, median};

/// Loss minimized by the boosting stages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Loss {
    /// `½(y − f)²`; leaves hold the mean residual.
    #[default]
    SquaredError,
    /// `|y − f|`; leaves hold the median residual.
    AbsoluteError,
}

impl Loss {
    /// Constant prediction the ensemble starts from.
    pub fn init_estimate(self, y: &[f64]) -> f64 {
        match self {
            Loss::SquaredError => mean(y),
            Loss::AbsoluteError => median(y.iter().copied()),
        }
    }

    /// Negative gradient of the loss w.r.t. the current prediction.
    pub fn negative_gradient(self, y: &[f64], f: &[f64]) -> Vec<f64> {
        y.iter()
            .zip(f)
            .map(|(&yi, &fi)| match self {
                Loss::SquaredError => yi - fi,
                Loss::AbsoluteError => {
                    if yi - fi >= 0.0 {
                        1.0
                    } else {
                        -1.0
                    }
                }
            })
            .collect()
    }

    /// Mean loss over all rows.
    pub fn loss(self, y: &[f64], f: &[f64]) -> f64 {
        if y.is_empty() {
            return 0.0;
        }
        let total: f64 = y
            .iter()
            .zip(f)
            .map(|(&yi, &fi)| match self {
                Loss::SquaredError => (yi - fi).powi(2),
                Loss::AbsoluteError => (yi - fi).abs(),
            })
            .sum();
        total / y.len() as f64
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelParams {
    pub loss: Loss,
    /// Shrinkage applied to every tree.
    pub learning_rate: f64,
    /// Number of boosting stages.
    pub n_estimators: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Fraction of rows drawn (without replacement) for each stage.
    pub subsample: f64,
    /// Seed for row subsampling.
    pub random_state: u64,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            loss: Loss::SquaredError,
            learning_rate: 0.1,
            n_estimators: 100,
            max_depth: 3,
            min_samples_split: 2,
            min_samples_leaf: 1,
            subsample: 1.0,
            random_state: 42,
        }
    }
}

impl ModelParams {
    pub fn validate(&self) -> Result<(), AppError> {
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(AppError::config(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if self.n_estimators == 0 {
            return Err(AppError::config("n_estimators must be at least 1"));
        }
        if self.max_depth == 0 {
            return Err(AppError::config("max_depth must be at least 1"));
        }
        if self.min_samples_split < 2 {
            return Err(AppError::config(format!(
                "min_samples_split must be at least 2, got {}",
                self.min_samples_split
            )));
        }
        if self.min_samples_leaf == 0 {
            return Err(AppError::config("min_samples_leaf must be at least 1"));
        }
        if !(self.subsample > 0.0 && self.subsample <= 1.0) {
            return Err(AppError::config(format!(
                "subsample must be in (0, 1], got {}",
                self.subsample
            )));
        }
        Ok(())
    }
}
