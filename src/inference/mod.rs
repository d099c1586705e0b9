//! Inference over a loaded pipeline.
//!
//! The pipeline is loaded once and shared read-only; prediction never
//! mutates it, so one [`InferenceService`] can serve concurrent requests.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use crate::domain::{PropertyRecord, Table};
use crate::error::AppError;
use crate::fit::Pipeline;
use crate::io::artifact::load_pipeline;

/// Apply a fitted pipeline to a table; one prediction per row.
pub fn make_prediction(input: &Table, model: &Pipeline) -> Result<Vec<f64>, AppError> {
    let predictions = model.predict(input)?;
    if let Some(bad) = predictions.iter().position(|p| !p.is_finite()) {
        return Err(AppError::inference(format!("Non-finite prediction for row {}.", bad + 1)));
    }
    debug!(rows = input.len(), "Predictions computed");
    Ok(predictions)
}

#[derive(Debug, Clone)]
pub struct InferenceService {
    pipeline: Arc<Pipeline>,
}

impl InferenceService {
    /// Load the artifact at `path`.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let pipeline = load_pipeline(path)?;
        info!(
            trained_at = %pipeline.meta().trained_at,
            trees = pipeline.regressor().n_trees(),
            "Model loaded from {}",
            path.display()
        );
        Ok(Self::from_pipeline(pipeline))
    }

    pub fn from_pipeline(pipeline: Pipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Predict a single record.
    pub fn predict_one(&self, record: PropertyRecord) -> Result<f64, AppError> {
        let predictions = make_prediction(&Table::single(record), &self.pipeline)?;
        predictions
            .first()
            .copied()
            .ok_or_else(|| AppError::inference("Model returned no prediction."))
    }

    pub fn predict_batch(&self, input: &Table) -> Result<Vec<f64>, AppError> {
        make_prediction(input, &self.pipeline)
    }
}
