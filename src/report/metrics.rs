//! Regression metrics.
//!
//! MAPE is reported as a fraction (0.12 = 12%). Targets equal to zero are
//! divided by `f64::EPSILON` instead, which makes the value meaningless but
//! finite; callers should not rely on MAPE when `y_true` contains zeros.

use serde::{Deserialize, Serialize};

use crate::domain::Table;
use crate::error::AppError;
use crate::fit::Pipeline;

/// Metric values for one evaluation run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    #[serde(rename = "MSE")]
    pub mse: f64,
    #[serde(rename = "MAE")]
    pub mae: f64,
    #[serde(rename = "MAPE")]
    pub mape: f64,
}

impl Metrics {
    pub fn compute(y_true: &[f64], y_pred: &[f64]) -> Result<Self, AppError> {
        Ok(Self {
            mse: mean_squared_error(y_true, y_pred)?,
            mae: mean_absolute_error(y_true, y_pred)?,
            mape: mean_absolute_percentage_error(y_true, y_pred)?,
        })
    }

    /// `(name, value)` pairs in reporting order.
    pub fn entries(&self) -> [(&'static str, f64); 3] {
        [("MSE", self.mse), ("MAE", self.mae), ("MAPE", self.mape)]
    }
}

/// Predict `x_test` with `model` and score against `y_test`.
pub fn evaluate_model(model: &Pipeline, x_test: &Table, y_test: &[f64]) -> Result<Metrics, AppError> {
    let y_pred = model.predict(x_test)?;
    Metrics::compute(y_test, &y_pred)
}

pub fn mean_squared_error(y_true: &[f64], y_pred: &[f64]) -> Result<f64, AppError> {
    mean_of(y_true, y_pred, |t, p| (t - p).powi(2))
}

pub fn mean_absolute_error(y_true: &[f64], y_pred: &[f64]) -> Result<f64, AppError> {
    mean_of(y_true, y_pred, |t, p| (t - p).abs())
}

pub fn mean_absolute_percentage_error(y_true: &[f64], y_pred: &[f64]) -> Result<f64, AppError> {
    mean_of(y_true, y_pred, |t, p| (t - p).abs() / t.abs().max(f64::EPSILON))
}

fn mean_of(y_true: &[f64], y_pred: &[f64], f: impl Fn(f64, f64) -> f64) -> Result<f64, AppError> {
    if y_true.len() != y_pred.len() {
        return Err(AppError::inference(format!(
            "Cannot score {} predictions against {} targets.",
            y_pred.len(),
            y_true.len()
        )));
    }
    if y_true.is_empty() {
        return Err(AppError::inference("Cannot score an empty evaluation set."));
    }
    let total: f64 = y_true.iter().zip(y_pred).map(|(&t, &p)| f(t, p)).sum();
    Ok(total / y_true.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_values() {
        let y = [100.0, 200.0, 400.0];
        let p = [110.0, 180.0, 400.0];
        let m = Metrics::compute(&y, &p).unwrap();
        assert!((m.mse - 500.0 / 3.0).abs() < 1e-9);
        assert!((m.mae - 10.0).abs() < 1e-9);
        assert!((m.mape - (0.1 + 0.1) / 3.0).abs() < 1e-12);
    }

    #[test]
    fn perfect_predictions_score_zero() {
        let y = [1.0, 2.0];
        let m = Metrics::compute(&y, &y).unwrap();
        assert_eq!(m.entries(), [("MSE", 0.0), ("MAE", 0.0), ("MAPE", 0.0)]);
    }

    #[test]
    fn zero_target_gives_huge_but_finite_mape() {
        let m = mean_absolute_percentage_error(&[0.0, 1.0], &[1.0, 1.0]).unwrap();
        assert!(m.is_finite());
        assert!(m > 1e10);
    }

    #[test]
    fn mismatched_or_empty_inputs_fail() {
        assert!(mean_squared_error(&[1.0], &[1.0, 2.0]).is_err());
        assert!(mean_absolute_error(&[], &[]).is_err());
    }

    #[test]
    fn serializes_with_metric_names() {
        let m = Metrics { mse: 1.0, mae: 2.0, mape: 0.5 };
        let json = serde_json::to_value(m).unwrap();
        assert_eq!(json["MAPE"], 0.5);
    }
}
