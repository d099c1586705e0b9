//! The composed preprocessing + regressor unit.
//!
//! A [`PipelineBlueprint`] is the unfitted composition; fitting it yields a
//! [`Pipeline`], which is immutable and is the only persisted artifact.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::Table;
use crate::error::AppError;
use crate::models::{GradientBoostingRegressor, ModelParams};
use crate::preprocess::{ColumnTransformer, FittedColumnTransformer};

/// Bumped whenever the serialized layout of [`Pipeline`] changes.
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineMeta {
    pub format_version: u32,
    pub tool: String,
    pub tool_version: String,
    pub trained_at: DateTime<Utc>,
    pub n_train_rows: usize,
    pub feature_names: Vec<String>,
}

/// Unfitted pipeline: a column transform followed by a boosting regressor.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineBlueprint {
    preprocessor: ColumnTransformer,
    params: ModelParams,
}

impl PipelineBlueprint {
    pub fn new(preprocessor: ColumnTransformer, params: ModelParams) -> Result<Self, AppError> {
        params.validate()?;
        Ok(Self { preprocessor, params })
    }

    pub fn preprocessor(&self) -> &ColumnTransformer {
        &self.preprocessor
    }

    pub fn params(&self) -> &ModelParams {
        &self.params
    }

    /// Fit the transform on `(x, y)`, then the regressor on the transformed matrix.
    pub fn fit(&self, x: &Table, y: &[f64]) -> Result<Pipeline, AppError> {
        if x.is_empty() {
            return Err(AppError::fit("Training table is empty."));
        }
        let preprocessor = self.preprocessor.fit(x, y)?;
        let features = preprocessor.transform(x)?;
        let regressor = GradientBoostingRegressor::fit(&features, y, &self.params)?;

        Ok(Pipeline {
            meta: PipelineMeta {
                format_version: ARTIFACT_FORMAT_VERSION,
                tool: env!("CARGO_PKG_NAME").to_string(),
                tool_version: env!("CARGO_PKG_VERSION").to_string(),
                trained_at: Utc::now(),
                n_train_rows: x.len(),
                feature_names: preprocessor.feature_names(),
            },
            preprocessor,
            regressor,
        })
    }
}

/// A fitted pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    meta: PipelineMeta,
    preprocessor: FittedColumnTransformer,
    regressor: GradientBoostingRegressor,
}

impl Pipeline {
    /// Transform and predict; one value per input row.
    pub fn predict(&self, x: &Table) -> Result<Vec<f64>, AppError> {
        let features = self.preprocessor.transform(x)?;
        self.regressor.predict(&features)
    }

    pub fn meta(&self) -> &PipelineMeta {
        &self.meta
    }

    pub fn preprocessor(&self) -> &FittedColumnTransformer {
        &self.preprocessor
    }

    pub fn regressor(&self) -> &GradientBoostingRegressor {
        &self.regressor
    }

    /// Feature importances paired with feature names, highest first.
    pub fn feature_importances(&self) -> Vec<(String, f64)> {
        let mut pairs: Vec<(String, f64)> = self
            .meta
            .feature_names
            .iter()
            .cloned()
            .zip(self.regressor.feature_importances())
            .collect();
        pairs.sort_by(|a, b| b.1.total_cmp(&a.1));
        pairs
    }
}
