//! Target encoding for a single categorical column.
//!
//! During fit every category is mapped to the mean target of the rows that
//! carry it. With `smoothing > 0` the category mean is shrunk toward the
//! global mean (the prior):
//!
//! ```text
//! enc(c) = λ·mean(c) + (1 − λ)·prior,   λ = n(c) / (n(c) + smoothing)
//! ```
//!
//! `smoothing = 0` gives the plain per-category mean.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::Column;
use crate::error::AppError;

/// What to do with a category that was not seen during fit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownCategory {
    /// Encode as the training prior (global target mean).
    #[default]
    Prior,
    /// Fail the transform.
    Error,
}

/// Encoder settings shared by every encoded column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderParams {
    pub smoothing: f64,
    pub handle_unknown: UnknownCategory,
}

impl Default for EncoderParams {
    fn default() -> Self {
        Self {
            smoothing: 0.0,
            handle_unknown: UnknownCategory::Prior,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryStat {
    pub count: usize,
    pub mean: f64,
    pub encoded: f64,
}

/// A fitted target encoder for one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetEncoder {
    column: Column,
    prior: f64,
    handle_unknown: UnknownCategory,
    categories: BTreeMap<String, CategoryStat>,
}

impl TargetEncoder {
    /// Fit from `(category, target)` pairs.
    pub fn fit<'a>(
        column: Column,
        keys: impl IntoIterator<Item = &'a str>,
        y: &[f64],
        params: EncoderParams,
    ) -> Result<Self, AppError> {
        if !(params.smoothing.is_finite() && params.smoothing >= 0.0) {
            return Err(AppError::config(format!(
                "Encoder smoothing must be finite and >= 0, got {}",
                params.smoothing
            )));
        }

        let mut sums: BTreeMap<String, (usize, f64)> = BTreeMap::new();
        let mut n = 0usize;
        for key in keys {
            let Some(&target) = y.get(n) else {
                return Err(AppError::fit(format!(
                    "Target encoder for `{column}`: more rows than the {} targets.",
                    y.len()
                )));
            };
            let entry = sums.entry(key.to_string()).or_insert((0, 0.0));
            entry.0 += 1;
            entry.1 += target;
            n += 1;
        }
        if n == 0 {
            return Err(AppError::fit(format!("Cannot fit target encoder for `{column}` on zero rows.")));
        }
        if n != y.len() {
            return Err(AppError::fit(format!(
                "Target encoder for `{column}`: {n} rows but {} targets.",
                y.len()
            )));
        }

        let prior = y.iter().sum::<f64>() / n as f64;
        let categories = sums
            .into_iter()
            .map(|(key, (count, sum))| {
                let mean = sum / count as f64;
                let lambda = count as f64 / (count as f64 + params.smoothing);
                let encoded = lambda * mean + (1.0 - lambda) * prior;
                (key, CategoryStat { count, mean, encoded })
            })
            .collect();

        Ok(Self {
            column,
            prior,
            handle_unknown: params.handle_unknown,
            categories,
        })
    }

    pub fn encode(&self, key: &str) -> Result<f64, AppError> {
        match self.categories.get(key) {
            Some(stat) => Ok(stat.encoded),
            None => match self.handle_unknown {
                UnknownCategory::Prior => Ok(self.prior),
                UnknownCategory::Error => Err(AppError::inference(format!(
                    "Unseen category '{key}' in column `{}`.",
                    self.column
                ))),
            },
        }
    }

    pub fn column(&self) -> Column {
        self.column
    }

    pub fn prior(&self) -> f64 {
        self.prior
    }

    pub fn categories(&self) -> &BTreeMap<String, CategoryStat> {
        &self.categories
    }
}
