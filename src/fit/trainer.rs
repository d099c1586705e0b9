//! Pipeline composition and training.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::pipeline::{Pipeline, PipelineBlueprint};
use crate::domain::{Column, Table};
use crate::error::AppError;
use crate::io::artifact::save_pipeline;
use crate::models::ModelParams;
use crate::preprocess::{EncoderParams, preprocessing};

/// Hyperparameter record for a training run.
///
/// This is also the schema of the `--params` JSON file; missing keys keep
/// their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingParams {
    pub model: ModelParams,
    pub encoder: EncoderParams,
    /// Numeric columns forwarded to the regressor unchanged.
    pub passthrough: Vec<Column>,
}

/// Compose the preprocessing step with a boosting regressor.
pub fn create_pipeline(categorical_features: &[Column], params: &TrainingParams) -> Result<PipelineBlueprint, AppError> {
    let names: Vec<&str> = categorical_features.iter().map(|c| c.name()).collect();
    let preprocessor = preprocessing(&names)?
        .with_passthrough(params.passthrough.clone())?
        .with_encoder(params.encoder);
    PipelineBlueprint::new(preprocessor, params.model.clone())
}

/// Fit the pipeline end-to-end and persist it to `artifact_path`.
///
/// The encoder sees `y_train` during fit. Any existing artifact is replaced.
pub fn train_model(
    x_train: &Table,
    y_train: &[f64],
    categorical_features: &[Column],
    params: &TrainingParams,
    artifact_path: &Path,
) -> Result<Pipeline, AppError> {
    info!("Starting model training...");

    let result = create_pipeline(categorical_features, params)
        .and_then(|blueprint| blueprint.fit(x_train, y_train))
        .and_then(|pipeline| save_pipeline(artifact_path, &pipeline).map(|()| pipeline));

    match result {
        Ok(pipeline) => {
            info!(
                trees = pipeline.regressor().n_trees(),
                features = pipeline.preprocessor().n_features(),
                "Model training completed and saved as {}",
                artifact_path.display()
            );
            Ok(pipeline)
        }
        Err(e) => {
            error!("Error during model training: {e}");
            Err(e)
        }
    }
}
