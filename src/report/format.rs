//! Formatted terminal output for training and evaluation runs.
//!
//! Formatting lives here so the fitting code stays free of presentation
//! concerns and output changes stay localized.

use crate::domain::{DataSource, Table};
use crate::fit::Pipeline;
use crate::report::Metrics;

/// Number of feature importances shown in the summary.
const TOP_IMPORTANCES: usize = 10;

/// Format the full run summary (data, model, importances, metrics).
pub fn format_run_summary(
    train: &DataSource,
    test: &DataSource,
    test_rows: &Table,
    pipeline: &Pipeline,
    metrics: &Metrics,
) -> String {
    let mut out = String::new();

    out.push_str("=== propval - Property Valuation Training ===\n");
    out.push_str(&format!("Train: {train}\n"));
    out.push_str(&format!("Test : {test}\n"));
    out.push_str(&format!(
        "Rows : train={} | test={}\n",
        pipeline.meta().n_train_rows,
        test_rows.len()
    ));

    out.push_str("\nModel:\n");
    out.push_str(&format_model(pipeline));

    out.push_str("\nFeature importances:\n");
    for (name, value) in pipeline.feature_importances().into_iter().take(TOP_IMPORTANCES) {
        out.push_str(&format!("  {:<24} {value:>8.4}\n", truncate(&name, 24)));
    }

    out.push_str("\nTest metrics:\n");
    out.push_str(&format_metrics(metrics));

    out
}

/// One line per metric.
pub fn format_metrics(metrics: &Metrics) -> String {
    let mut out = String::new();
    for (name, value) in metrics.entries() {
        out.push_str(&format!("  {name:<5} {value:.6}\n"));
    }
    out
}

fn format_model(pipeline: &Pipeline) -> String {
    let gbr = pipeline.regressor();
    let params = gbr.params();
    let mut out = String::new();
    out.push_str(&format!(
        "- gradient boosting (loss={:?}, trees={}, lr={}, depth={})\n",
        params.loss,
        gbr.n_trees(),
        params.learning_rate,
        params.max_depth
    ));
    let score = gbr.train_score();
    if let (Some(first), Some(last)) = (score.first(), score.last()) {
        out.push_str(&format!(
            "- train loss: {first:.6} -> {last:.6} over {} stages\n",
            score.len()
        ));
    }
    out.push_str(&format!("- features: {}\n", pipeline.meta().feature_names.join(", ")));
    out.push_str(&format!("- trained at: {}\n", pipeline.meta().trained_at.to_rfc3339()));
    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}
