//! Export per-row predictions to CSV and metrics to JSON.
//!
//! The exports are meant to be easy to consume in spreadsheets or downstream scripts.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::domain::{PropertyRecord, Table};
use crate::error::AppError;
use crate::report::Metrics;

#[derive(Serialize)]
struct PredictionRow<'a> {
    #[serde(rename = "type")]
    property_type: &'a str,
    sector: &'a str,
    net_usable_area: f64,
    net_area: f64,
    n_rooms: f64,
    n_bathroom: f64,
    latitude: f64,
    longitude: f64,
    price: Option<f64>,
    prediction: f64,
}

impl<'a> PredictionRow<'a> {
    fn new(r: &'a PropertyRecord, price: Option<f64>, prediction: f64) -> Self {
        Self {
            property_type: &r.property_type,
            sector: &r.sector,
            net_usable_area: r.net_usable_area,
            net_area: r.net_area,
            n_rooms: r.n_rooms,
            n_bathroom: r.n_bathroom,
            latitude: r.latitude,
            longitude: r.longitude,
            price,
            prediction,
        }
    }
}

/// Write input rows with their predictions to a CSV file.
///
/// `prices` holds the known targets when available; the `price` column is
/// left empty otherwise.
pub fn write_predictions_csv(
    path: &Path,
    rows: &Table,
    prices: Option<&[f64]>,
    predictions: &[f64],
) -> Result<(), AppError> {
    if rows.len() != predictions.len() || prices.is_some_and(|p| p.len() != rows.len()) {
        return Err(AppError::io(format!(
            "Export row count mismatch: {} rows, {} predictions.",
            rows.len(),
            predictions.len()
        )));
    }
    create_parent(path)?;

    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::io(format!("Failed to create export CSV '{}': {e}", path.display())))?;
    for (idx, (record, &prediction)) in rows.rows().iter().zip(predictions).enumerate() {
        let price = prices.map(|p| p[idx]).or(record.price);
        writer
            .serialize(PredictionRow::new(record, price, prediction))
            .map_err(|e| AppError::io(format!("Failed to write export CSV row: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::io(format!("Failed to write export CSV: {e}")))?;

    Ok(())
}

/// Write evaluation metrics as a JSON object (`{"MSE": .., "MAE": .., "MAPE": ..}`).
pub fn write_metrics_json(path: &Path, metrics: &Metrics) -> Result<(), AppError> {
    create_parent(path)?;
    let file = File::create(path)
        .map_err(|e| AppError::io(format!("Failed to create metrics file '{}': {e}", path.display())))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, metrics)
        .map_err(|e| AppError::io(format!("Failed to write metrics file: {e}")))?;
    writer
        .flush()
        .map_err(|e| AppError::io(format!("Failed to write metrics file: {e}")))
}

fn create_parent(path: &Path) -> Result<(), AppError> {
    match path.parent().filter(|d| !d.as_os_str().is_empty()) {
        Some(dir) => fs::create_dir_all(dir)
            .map_err(|e| AppError::io(format!("Failed to create directory '{}': {e}", dir.display()))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample_record;

    #[test]
    fn predictions_csv_has_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("predictions.csv");
        let rows = Table::new(vec![sample_record(), sample_record()]);

        write_predictions_csv(&path, &rows, Some(&[100.0, 200.0]), &[110.0, 190.0]).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "type,sector,net_usable_area,net_area,n_rooms,n_bathroom,latitude,longitude,price,prediction"
        );
        assert!(lines.next().unwrap().ends_with(",100.0,110.0"));
        assert_eq!(lines.count(), 1);
    }

    #[test]
    fn missing_prices_leave_column_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.csv");
        write_predictions_csv(&path, &Table::single(sample_record()), None, &[5.0]).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.lines().nth(1).unwrap().ends_with(",,5.0"));
    }

    #[test]
    fn row_count_mismatch_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.csv");
        assert!(write_predictions_csv(&path, &Table::single(sample_record()), None, &[]).is_err());
    }

    #[test]
    fn metrics_json_uses_metric_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics.json");
        write_metrics_json(&path, &Metrics { mse: 1.0, mae: 0.5, mape: 0.25 }).unwrap();
        let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["MAE"], 0.5);
    }
}
