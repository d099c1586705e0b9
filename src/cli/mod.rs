//! Command-line parsing for the property valuation tool.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the training/serving code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::{DEFAULT_LOG_DIR, DEFAULT_MODEL_PATH};
use crate::domain::{Column, parse_column_list};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "propval", version, about = "Property valuation: train, evaluate and serve a price model")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Load data, train the pipeline, save it and report test metrics.
    ///
    /// This is also what a bare `propval` runs.
    Train(TrainArgs),
    /// Score a saved pipeline on a labeled CSV.
    Evaluate(EvaluateArgs),
    /// Batch-predict a CSV with a saved pipeline.
    Predict(PredictArgs),
    /// Run the HTTP prediction service.
    Serve(ServeArgs),
}

#[derive(Debug, Args, Clone)]
pub struct TrainArgs {
    /// Training CSV.
    #[arg(long, value_name = "CSV", default_value = "data/train.csv")]
    pub train: PathBuf,

    /// Held-out test CSV.
    #[arg(long, value_name = "CSV", default_value = "data/test.csv")]
    pub test: PathBuf,

    /// Where to write the fitted pipeline.
    #[arg(long = "model-out", value_name = "PATH", default_value = DEFAULT_MODEL_PATH)]
    pub model_out: PathBuf,

    /// Hyperparameter JSON file (regressor, encoder, passthrough columns).
    #[arg(long, value_name = "JSON")]
    pub params: Option<PathBuf>,

    /// Comma-separated columns to target-encode.
    #[arg(long, value_name = "COLS", default_value = "type,sector", value_parser = parse_columns)]
    pub categorical: ColumnList,

    /// Comma-separated numeric columns passed to the regressor unchanged.
    /// Overrides `passthrough` from the params file.
    #[arg(long, value_name = "COLS", value_parser = parse_columns)]
    pub passthrough: Option<ColumnList>,

    /// Read train/test rows from this SQLite database instead of CSV.
    #[arg(long, value_name = "SQLITE", requires_all = ["train_query", "test_query"])]
    pub db: Option<PathBuf>,

    /// Query returning training rows (with `--db`).
    #[arg(long = "train-query", value_name = "SQL", requires = "db")]
    pub train_query: Option<String>,

    /// Query returning test rows (with `--db`).
    #[arg(long = "test-query", value_name = "SQL", requires = "db")]
    pub test_query: Option<String>,

    /// Export per-row test predictions to CSV.
    #[arg(long = "export-predictions", value_name = "CSV")]
    pub export_predictions: Option<PathBuf>,

    /// Export test metrics to JSON.
    #[arg(long = "export-metrics", value_name = "JSON")]
    pub export_metrics: Option<PathBuf>,

    /// Directory for `pipeline.log`.
    #[arg(long = "log-dir", value_name = "DIR", default_value = DEFAULT_LOG_DIR)]
    pub log_dir: PathBuf,
}

#[derive(Debug, Args, Clone)]
pub struct EvaluateArgs {
    /// Saved pipeline.
    #[arg(long, value_name = "PATH", default_value = DEFAULT_MODEL_PATH)]
    pub model: PathBuf,

    /// Labeled CSV to score.
    #[arg(long, value_name = "CSV", default_value = "data/test.csv")]
    pub test: PathBuf,

    /// Export metrics to JSON.
    #[arg(long = "export-metrics", value_name = "JSON")]
    pub export_metrics: Option<PathBuf>,

    #[arg(long = "log-dir", value_name = "DIR", default_value = DEFAULT_LOG_DIR)]
    pub log_dir: PathBuf,
}

#[derive(Debug, Args, Clone)]
pub struct PredictArgs {
    /// Saved pipeline.
    #[arg(long, value_name = "PATH", default_value = DEFAULT_MODEL_PATH)]
    pub model: PathBuf,

    /// CSV of properties to price (`price` column optional).
    #[arg(long, value_name = "CSV")]
    pub input: PathBuf,

    /// Write predictions here instead of stdout.
    #[arg(long, value_name = "CSV")]
    pub output: Option<PathBuf>,

    #[arg(long = "log-dir", value_name = "DIR", default_value = DEFAULT_LOG_DIR)]
    pub log_dir: PathBuf,
}

/// Flags override `MODEL_PATH`, `BIND_ADDR` and `LOG_DIR`.
#[derive(Debug, Args, Clone)]
pub struct ServeArgs {
    #[arg(long, value_name = "PATH")]
    pub model: Option<PathBuf>,

    #[arg(long, value_name = "ADDR")]
    pub addr: Option<String>,

    #[arg(long = "log-dir", value_name = "DIR")]
    pub log_dir: Option<PathBuf>,
}

/// Parsed `--categorical`/`--passthrough` value.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnList(pub Vec<Column>);

fn parse_columns(s: &str) -> Result<ColumnList, String> {
    parse_column_list(s).map(ColumnList).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn train_defaults() {
        let cli = Cli::try_parse_from(["propval", "train"]).unwrap();
        let Command::Train(args) = cli.command else {
            panic!("expected train");
        };
        assert_eq!(args.train, PathBuf::from("data/train.csv"));
        assert_eq!(args.model_out, PathBuf::from("model/model_pipeline.json"));
        assert_eq!(args.categorical.0, vec![Column::Type, Column::Sector]);
        assert!(args.passthrough.is_none());
    }

    #[test]
    fn db_requires_both_queries() {
        assert!(Cli::try_parse_from(["propval", "train", "--db", "x.sqlite", "--train-query", "SELECT 1"]).is_err());
        assert!(
            Cli::try_parse_from([
                "propval",
                "train",
                "--db",
                "x.sqlite",
                "--train-query",
                "SELECT * FROM train",
                "--test-query",
                "SELECT * FROM test",
            ])
            .is_ok()
        );
    }

    #[test]
    fn unknown_column_is_rejected() {
        assert!(Cli::try_parse_from(["propval", "train", "--categorical", "type,colour"]).is_err());
    }

    #[test]
    fn serve_flags_are_optional() {
        let cli = Cli::try_parse_from(["propval", "serve", "--addr", "127.0.0.1:9000"]).unwrap();
        let Command::Serve(args) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(args.addr.as_deref(), Some("127.0.0.1:9000"));
        assert!(args.model.is_none());
    }
}
