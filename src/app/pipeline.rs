//! The offline "train" workflow shared by `propval` and `propval train`.
//!
//! load train/test -> split target -> fit + persist pipeline -> evaluate -> export
//!
//! Each stage logs its own failure; the first error aborts the run and is
//! returned to the caller.

use std::path::Path;

use tracing::info;

use crate::domain::{DataSource, PipelineConfig, Table};
use crate::error::AppError;
use crate::fit::{Pipeline, train_model};
use crate::inference::make_prediction;
use crate::io::db::load_table_from_db;
use crate::io::export::{write_metrics_json, write_predictions_csv};
use crate::io::ingest::{load_test_data, load_train_data};
use crate::report::{Metrics, evaluate_model};

/// All computed outputs of a single training run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub pipeline: Pipeline,
    pub test: Table,
    pub metrics: Metrics,
}

/// Execute the full training pipeline.
pub fn run_pipeline(config: &PipelineConfig) -> Result<RunOutput, AppError> {
    let train = load_source(&config.train, load_train_data)?;
    let test = load_source(&config.test, load_test_data)?;

    let (x_train, y_train) = train.split_target()?;
    let (x_test, y_test) = test.split_target()?;

    let pipeline = train_model(
        &x_train,
        &y_train,
        &config.categorical,
        &config.params,
        &config.artifact_path,
    )?;

    let metrics = evaluate_model(&pipeline, &x_test, &y_test)?;
    info!(
        "Model Evaluation Metrics: MSE: {:.4}, MAE: {:.4}, MAPE: {:.6}",
        metrics.mse, metrics.mae, metrics.mape
    );

    if let Some(path) = &config.export_predictions {
        let predictions = make_prediction(&x_test, &pipeline)?;
        write_predictions_csv(path, &x_test, Some(&y_test), &predictions)?;
        info!("Test predictions written to {}", path.display());
    }
    if let Some(path) = &config.export_metrics {
        write_metrics_json(path, &metrics)?;
        info!("Metrics written to {}", path.display());
    }

    Ok(RunOutput {
        pipeline,
        test: x_test,
        metrics,
    })
}

fn load_source(
    source: &DataSource,
    load_csv: fn(&Path) -> Result<Table, AppError>,
) -> Result<Table, AppError> {
    match source {
        DataSource::Csv(path) => load_csv(path),
        DataSource::Query { db, sql } => load_table_from_db(db, sql),
    }
}
