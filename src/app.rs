//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - sets up logging
//! - dispatches to training, evaluation, batch prediction or the HTTP service

use std::path::Path;

use clap::Parser;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;

use crate::api::{ApiKeyConfig, AppState};
use crate::cli::{Command, EvaluateArgs, PredictArgs, ServeArgs, TrainArgs};
use crate::config::{ServiceConfig, load_params};
use crate::domain::{DataSource, PipelineConfig};
use crate::error::AppError;
use crate::fit::TrainingParams;
use crate::inference::InferenceService;
use crate::io::{export, ingest};
use crate::logging::{API_LOG, PIPELINE_LOG};
use crate::report::{self, format};

pub mod pipeline;

/// Entry point for the `propval` binary.
pub fn run() -> Result<(), AppError> {
    // A bare `propval` (or `propval --train x.csv`) runs training.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    match cli.command {
        Command::Train(args) => handle_train(args),
        Command::Evaluate(args) => handle_evaluate(args),
        Command::Predict(args) => handle_predict(args),
        Command::Serve(args) => handle_serve(args),
    }
}

fn init_logging(dir: &Path, file_name: &str) -> Result<WorkerGuard, AppError> {
    Ok(crate::logging::init(dir, file_name)?)
}

fn handle_train(args: TrainArgs) -> Result<(), AppError> {
    let _guard = init_logging(&args.log_dir, PIPELINE_LOG)?;
    let config = pipeline_config_from_args(&args)?;
    let run = pipeline::run_pipeline(&config)?;

    println!(
        "{}",
        format::format_run_summary(&config.train, &config.test, &run.test, &run.pipeline, &run.metrics)
    );
    Ok(())
}

fn handle_evaluate(args: EvaluateArgs) -> Result<(), AppError> {
    let _guard = init_logging(&args.log_dir, PIPELINE_LOG)?;
    let service = InferenceService::load(&args.model)?;
    let (x_test, y_test) = ingest::load_test_data(&args.test)?.split_target()?;

    let metrics = report::evaluate_model(service.pipeline(), &x_test, &y_test)?;
    info!(
        "Model Evaluation Metrics: MSE: {:.4}, MAE: {:.4}, MAPE: {:.6}",
        metrics.mse, metrics.mae, metrics.mape
    );
    print!("{}", format::format_metrics(&metrics));

    if let Some(path) = &args.export_metrics {
        export::write_metrics_json(path, &metrics)?;
    }
    Ok(())
}

fn handle_predict(args: PredictArgs) -> Result<(), AppError> {
    let _guard = init_logging(&args.log_dir, PIPELINE_LOG)?;
    let service = InferenceService::load(&args.model)?;
    let input = ingest::load_input_data(&args.input)?;
    let predictions = service.predict_batch(&input)?;

    match &args.output {
        Some(path) => {
            export::write_predictions_csv(path, &input, None, &predictions)?;
            info!("{} predictions written to {}", predictions.len(), path.display());
        }
        None => {
            for p in &predictions {
                println!("{p}");
            }
        }
    }
    Ok(())
}

fn handle_serve(args: ServeArgs) -> Result<(), AppError> {
    let config = service_config_from_args(ServiceConfig::from_env()?, &args);
    let _guard = init_logging(&config.log_dir, API_LOG)?;

    let state = AppState {
        service: InferenceService::load(&config.model_path)?,
        api_key: ApiKeyConfig::new(&config.api_key_header, config.api_key.clone())?,
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| AppError::serve(format!("Failed to start async runtime: {e}")))?;
    runtime.block_on(crate::api::serve(state, &config.bind_addr))
}

pub fn pipeline_config_from_args(args: &TrainArgs) -> Result<PipelineConfig, AppError> {
    let mut params = match &args.params {
        Some(path) => load_params(path)?,
        None => TrainingParams::default(),
    };
    if let Some(cols) = &args.passthrough {
        params.passthrough = cols.0.clone();
    }

    let (train, test) = match (&args.db, &args.train_query, &args.test_query) {
        (Some(db), Some(train_sql), Some(test_sql)) => (
            DataSource::Query {
                db: db.clone(),
                sql: train_sql.clone(),
            },
            DataSource::Query {
                db: db.clone(),
                sql: test_sql.clone(),
            },
        ),
        (Some(_), _, _) => {
            return Err(AppError::config("--db needs both --train-query and --test-query."));
        }
        _ => (DataSource::Csv(args.train.clone()), DataSource::Csv(args.test.clone())),
    };

    Ok(PipelineConfig {
        train,
        test,
        artifact_path: args.model_out.clone(),
        categorical: args.categorical.0.clone(),
        params,
        export_predictions: args.export_predictions.clone(),
        export_metrics: args.export_metrics.clone(),
    })
}

fn service_config_from_args(mut config: ServiceConfig, args: &ServeArgs) -> ServiceConfig {
    if let Some(model) = &args.model {
        config.model_path = model.clone();
    }
    if let Some(addr) = &args.addr {
        config.bind_addr = addr.clone();
    }
    if let Some(dir) = &args.log_dir {
        config.log_dir = dir.clone();
    }
    config
}

/// Rewrite argv so `propval` defaults to `propval train`.
///
/// Rules:
/// - `propval`                      -> `propval train`
/// - `propval --train x.csv ...`    -> `propval train --train x.csv ...`
/// - `propval --help/--version/-h`  -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("train".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    // If the first token is a flag, treat it as "train flags".
    if arg1.starts_with('-') {
        argv.insert(1, "train".to_string());
    }
    argv
}
