//! CART regression tree used as the boosting base learner.
//!
//! Nodes are stored in a flat vector with the root at index 0. A row goes left
//! when `x[feature] <= threshold`; a NaN feature value always goes right.
//!
//! Split search is exhaustive: for every feature the candidate rows are sorted
//! and every boundary between distinct values is scored by its reduction in
//! squared error. Features are scanned in parallel; the winning split is the
//! highest gain, ties going to the lowest feature index so results do not
//! depend on thread scheduling.

use nalgebra::DMatrix;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeParams {
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
        /// Reduction in squared error achieved by this split.
        gain: f64,
    },
    Leaf {
        value: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<Node>,
}

#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature: usize,
    threshold: f64,
    gain: f64,
}

struct Grower<'a> {
    x: &'a DMatrix<f64>,
    target: &'a [f64],
    params: TreeParams,
    leaf_value: &'a dyn Fn(&[usize]) -> f64,
    nodes: Vec<Node>,
}

impl RegressionTree {
    /// Grow a tree on `target` restricted to `rows`.
    ///
    /// Splits are chosen on `target`; leaf values come from `leaf_value`,
    /// which receives the rows that landed in the leaf.
    pub fn fit(
        x: &DMatrix<f64>,
        target: &[f64],
        rows: &[usize],
        params: TreeParams,
        leaf_value: &dyn Fn(&[usize]) -> f64,
    ) -> Self {
        let mut grower = Grower {
            x,
            target,
            params,
            leaf_value,
            nodes: Vec::new(),
        };
        grower.grow(rows.to_vec(), 0);
        Self { nodes: grower.nodes }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| matches!(n, Node::Leaf { .. })).count()
    }

    /// Predict a single row of `x`.
    pub fn predict_row(&self, x: &DMatrix<f64>, row: usize) -> f64 {
        let mut idx = 0;
        loop {
            match self.nodes[idx] {
                Node::Leaf { value } => return value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    idx = if x[(row, feature)] <= threshold { left } else { right };
                }
            }
        }
    }

    /// Add each split's gain to the slot of the feature it splits on.
    pub fn accumulate_gain(&self, out: &mut [f64]) {
        for node in &self.nodes {
            if let Node::Split { feature, gain, .. } = *node {
                out[feature] += gain;
            }
        }
    }
}

impl Grower<'_> {
    fn grow(&mut self, rows: Vec<usize>, depth: usize) -> usize {
        let idx = self.nodes.len();
        self.nodes.push(Node::Leaf { value: 0.0 });

        let split = if depth < self.params.max_depth && rows.len() >= self.params.min_samples_split {
            best_split(self.x, self.target, self.params.min_samples_leaf, &rows)
        } else {
            None
        };

        let Some(split) = split else {
            self.nodes[idx] = Node::Leaf {
                value: (self.leaf_value)(&rows),
            };
            return idx;
        };

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .into_iter()
            .partition(|&r| self.x[(r, split.feature)] <= split.threshold);

        let left = self.grow(left_rows, depth + 1);
        let right = self.grow(right_rows, depth + 1);
        self.nodes[idx] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
            gain: split.gain,
        };
        idx
    }
}

fn best_split(x: &DMatrix<f64>, target: &[f64], min_leaf: usize, rows: &[usize]) -> Option<SplitCandidate> {
    let n = rows.len() as f64;
    let (sum, sum_sq) = rows.iter().fold((0.0, 0.0), |(s, ss), &r| {
        let t = target[r];
        (s + t, ss + t * t)
    });
    let parent = sum * sum / n;
    // Ignore gains that are just rounding noise relative to the node's scale.
    let min_gain = 1e-12 * sum_sq.max(1.0);

    let per_feature: Vec<Option<SplitCandidate>> = (0..x.ncols())
        .into_par_iter()
        .map(|feature| best_split_for_feature(x, target, min_leaf, rows, feature, sum, parent))
        .collect();

    per_feature
        .into_iter()
        .flatten()
        .filter(|c| c.gain > min_gain)
        .fold(None, |best: Option<SplitCandidate>, c| match best {
            Some(b) if b.gain >= c.gain => Some(b),
            _ => Some(c),
        })
}

fn best_split_for_feature(
    x: &DMatrix<f64>,
    target: &[f64],
    min_leaf: usize,
    rows: &[usize],
    feature: usize,
    sum: f64,
    parent: f64,
) -> Option<SplitCandidate> {
    let mut pairs: Vec<(f64, f64)> = rows.iter().map(|&r| (x[(r, feature)], target[r])).collect();
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

    let n = pairs.len();
    let mut left_sum = 0.0;
    let mut best: Option<SplitCandidate> = None;

    for i in 0..n.saturating_sub(1) {
        left_sum += pairs[i].1;
        let n_left = i + 1;
        let n_right = n - n_left;
        let (lo, hi) = (pairs[i].0, pairs[i + 1].0);
        if lo == hi || n_left < min_leaf || n_right < min_leaf {
            continue;
        }

        let mut threshold = 0.5 * (lo + hi);
        if !threshold.is_finite() {
            continue;
        }
        if threshold >= hi {
            threshold = lo;
        }

        let right_sum = sum - left_sum;
        let gain = left_sum * left_sum / n_left as f64 + right_sum * right_sum / n_right as f64 - parent;
        if best.is_none_or(|b| gain > b.gain) {
            best = Some(SplitCandidate {
                feature,
                threshold,
                gain,
            });
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::mean;

    fn params(max_depth: usize) -> TreeParams {
        TreeParams {
            max_depth,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }

    #[test]
    fn recovers_a_step_function() {
        let x = DMatrix::from_row_slice(6, 1, &[1.0, 2.0, 3.0, 10.0, 11.0, 12.0]);
        let y = [5.0, 5.0, 5.0, 20.0, 20.0, 20.0];
        let rows: Vec<usize> = (0..6).collect();
        let leaf = |rs: &[usize]| mean(&rs.iter().map(|&r| y[r]).collect::<Vec<_>>());
        let tree = RegressionTree::fit(&x, &y, &rows, params(3), &leaf);

        assert_eq!(tree.n_leaves(), 2);
        match tree.nodes()[0] {
            Node::Split { feature, threshold, .. } => {
                assert_eq!(feature, 0);
                assert_eq!(threshold, 6.5);
            }
            _ => panic!("root should split"),
        }
        for r in 0..6 {
            assert_eq!(tree.predict_row(&x, r), y[r]);
        }
    }

    #[test]
    fn picks_the_informative_feature() {
        // Feature 0 is noise, feature 1 separates the target.
        let x = DMatrix::from_row_slice(4, 2, &[3.0, 0.0, 1.0, 0.0, 4.0, 1.0, 2.0, 1.0]);
        let y = [0.0, 0.0, 8.0, 8.0];
        let rows: Vec<usize> = (0..4).collect();
        let leaf = |rs: &[usize]| mean(&rs.iter().map(|&r| y[r]).collect::<Vec<_>>());
        let tree = RegressionTree::fit(&x, &y, &rows, params(1), &leaf);

        let mut gains = vec![0.0; 2];
        tree.accumulate_gain(&mut gains);
        assert_eq!(gains[0], 0.0);
        assert!(gains[1] > 0.0);
    }

    #[test]
    fn constant_target_is_a_single_leaf() {
        let x = DMatrix::from_row_slice(3, 1, &[1.0, 2.0, 3.0]);
        let y = [0.0, 0.0, 0.0];
        let tree = RegressionTree::fit(&x, &y, &[0, 1, 2], params(3), &|_: &[usize]| 7.0);
        assert_eq!(tree.nodes(), &[Node::Leaf { value: 7.0 }]);
    }

    #[test]
    fn min_samples_leaf_is_respected() {
        let x = DMatrix::from_row_slice(4, 1, &[1.0, 2.0, 3.0, 4.0]);
        let y = [100.0, 0.0, 0.0, 0.0];
        let p = TreeParams {
            min_samples_leaf: 2,
            ..params(1)
        };
        let tree = RegressionTree::fit(&x, &y, &[0, 1, 2, 3], p, &|rs: &[usize]| rs.len() as f64);
        for node in tree.nodes() {
            if let Node::Leaf { value } = node {
                assert!(*value >= 2.0);
            }
        }
    }
}
