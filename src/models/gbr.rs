//! Stagewise gradient-boosted regression trees.
//!
//! Training starts from a constant (mean or median of `y`) and, for each
//! stage, fits a [`RegressionTree`] to the negative gradient of the loss on an
//! optional row subsample, then adds `learning_rate * tree(x)` to the running
//! prediction of every row.

use nalgebra::DMatrix;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::params::{Loss, ModelParams};
use super::tree::{RegressionTree, TreeParams};
use crate::error::AppError;
use crate::math::{mean, median};

/// A fitted gradient-boosting regressor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostingRegressor {
    params: ModelParams,
    init: f64,
    n_features: usize,
    trees: Vec<RegressionTree>,
    /// Mean training loss after each stage.
    train_score: Vec<f64>,
}

impl GradientBoostingRegressor {
    pub fn fit(x: &DMatrix<f64>, y: &[f64], params: &ModelParams) -> Result<Self, AppError> {
        params.validate()?;
        let n = y.len();
        if n == 0 {
            return Err(AppError::fit("Cannot fit a regressor on zero rows."));
        }
        if x.nrows() != n {
            return Err(AppError::fit(format!(
                "Feature matrix has {} rows but target has {n}.",
                x.nrows()
            )));
        }
        if x.ncols() == 0 {
            return Err(AppError::fit("Feature matrix has no columns."));
        }
        if y.iter().any(|v| !v.is_finite()) {
            return Err(AppError::fit("Target contains non-finite values."));
        }

        let loss = params.loss;
        let tree_params = TreeParams {
            max_depth: params.max_depth,
            min_samples_split: params.min_samples_split,
            min_samples_leaf: params.min_samples_leaf,
        };
        let init = loss.init_estimate(y);
        let mut f = vec![init; n];
        let mut rng = StdRng::seed_from_u64(params.random_state);
        let n_inbag = ((params.subsample * n as f64) as usize).clamp(1, n);
        let all_rows: Vec<usize> = (0..n).collect();

        let mut trees = Vec::with_capacity(params.n_estimators);
        let mut train_score = Vec::with_capacity(params.n_estimators);

        for stage in 0..params.n_estimators {
            let gradient = loss.negative_gradient(y, &f);
            let rows = if n_inbag < n {
                let mut sample = rand::seq::index::sample(&mut rng, n, n_inbag).into_vec();
                sample.sort_unstable();
                sample
            } else {
                all_rows.clone()
            };

            let tree = {
                let leaf_value = |leaf: &[usize]| match loss {
                    Loss::SquaredError => mean(&leaf.iter().map(|&r| gradient[r]).collect::<Vec<_>>()),
                    Loss::AbsoluteError => median(leaf.iter().map(|&r| y[r] - f[r])),
                };
                RegressionTree::fit(x, &gradient, &rows, tree_params, &leaf_value)
            };

            for (row, fi) in f.iter_mut().enumerate() {
                *fi += params.learning_rate * tree.predict_row(x, row);
            }
            let score = loss.loss(y, &f);
            debug!(stage, leaves = tree.n_leaves(), train_loss = score, "boosting stage");

            trees.push(tree);
            train_score.push(score);
        }

        Ok(Self {
            params: params.clone(),
            init,
            n_features: x.ncols(),
            trees,
            train_score,
        })
    }

    pub fn predict(&self, x: &DMatrix<f64>) -> Result<Vec<f64>, AppError> {
        if x.ncols() != self.n_features {
            return Err(AppError::inference(format!(
                "Regressor expects {} features, got {}.",
                self.n_features,
                x.ncols()
            )));
        }
        let lr = self.params.learning_rate;
        Ok((0..x.nrows())
            .map(|row| {
                self.trees
                    .iter()
                    .fold(self.init, |acc, tree| acc + lr * tree.predict_row(x, row))
            })
            .collect())
    }

    /// Impurity-based importances: each tree's gains normalized to sum to 1,
    /// averaged over trees, then normalized again.
    pub fn feature_importances(&self) -> Vec<f64> {
        let mut total = vec![0.0; self.n_features];
        let mut per_tree = vec![0.0; self.n_features];
        for tree in &self.trees {
            per_tree.iter_mut().for_each(|v| *v = 0.0);
            tree.accumulate_gain(&mut per_tree);
            let sum: f64 = per_tree.iter().sum();
            if sum > 0.0 {
                for (t, g) in total.iter_mut().zip(&per_tree) {
                    *t += g / sum;
                }
            }
        }
        let sum: f64 = total.iter().sum();
        if sum > 0.0 {
            total.iter_mut().for_each(|v| *v /= sum);
        }
        total
    }

    pub fn params(&self) -> &ModelParams {
        &self.params
    }

    pub fn init_estimate(&self) -> f64 {
        self.init
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn train_score(&self) -> &[f64] {
        &self.train_score
    }
}
