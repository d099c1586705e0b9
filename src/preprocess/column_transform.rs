//! Column transform: target-encode the listed columns, forward explicit
//! passthrough columns, drop the rest.
//!
//! Output layout is fixed at construction: encoded columns first, then
//! passthrough columns, each group in the order given.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::target_encoder::{EncoderParams, TargetEncoder};
use crate::domain::{Cell, Column, ColumnKind, Table};
use crate::error::AppError;

/// Unfitted column transform.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnTransformer {
    categorical: Vec<Column>,
    passthrough: Vec<Column>,
    encoder: EncoderParams,
}

/// Build a transform that target-encodes exactly `categorical_cols`.
///
/// Every other column is dropped unless added with
/// [`ColumnTransformer::with_passthrough`].
pub fn preprocessing(categorical_cols: &[&str]) -> Result<ColumnTransformer, AppError> {
    info!("Creating preprocessing pipeline with target encoding for categorical columns");
    let result = categorical_cols
        .iter()
        .map(|name| name.parse::<Column>())
        .collect::<Result<Vec<_>, _>>()
        .and_then(ColumnTransformer::new);
    match result {
        Ok(transformer) => {
            info!("Preprocessing pipeline created successfully.");
            Ok(transformer)
        }
        Err(e) => {
            error!("Error creating preprocessing pipeline: {e}");
            Err(e)
        }
    }
}

impl ColumnTransformer {
    pub fn new(categorical: Vec<Column>) -> Result<Self, AppError> {
        if categorical.is_empty() {
            return Err(AppError::config("At least one column must be target-encoded."));
        }
        ensure_unique(&categorical)?;
        Ok(Self {
            categorical,
            passthrough: Vec::new(),
            encoder: EncoderParams::default(),
        })
    }

    /// Forward numeric columns to the regressor unchanged.
    pub fn with_passthrough(mut self, passthrough: Vec<Column>) -> Result<Self, AppError> {
        for c in &passthrough {
            if c.kind() != ColumnKind::Numeric {
                return Err(AppError::config(format!(
                    "Column `{c}` holds labels and cannot be passed through; encode it instead."
                )));
            }
        }
        let mut all = self.categorical.clone();
        all.extend(passthrough.iter().copied());
        ensure_unique(&all)?;
        self.passthrough = passthrough;
        Ok(self)
    }

    pub fn with_encoder(mut self, encoder: EncoderParams) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn categorical(&self) -> &[Column] {
        &self.categorical
    }

    pub fn passthrough(&self) -> &[Column] {
        &self.passthrough
    }

    /// Fit one encoder per categorical column against `y`.
    pub fn fit(&self, x: &Table, y: &[f64]) -> Result<FittedColumnTransformer, AppError> {
        if x.len() != y.len() {
            return Err(AppError::fit(format!(
                "Feature table has {} rows but target has {}.",
                x.len(),
                y.len()
            )));
        }
        if let Some(bad) = y.iter().find(|v| !v.is_finite()) {
            return Err(AppError::fit(format!("Non-finite target value {bad}.")));
        }

        let encoders = self
            .categorical
            .iter()
            .map(|&column| {
                let keys: Vec<_> = x.column(column).map(|cell| cell.category_key().into_owned()).collect();
                TargetEncoder::fit(column, keys.iter().map(String::as_str), y, self.encoder)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(FittedColumnTransformer {
            encoders,
            passthrough: self.passthrough.clone(),
        })
    }
}

fn ensure_unique(columns: &[Column]) -> Result<(), AppError> {
    for (i, c) in columns.iter().enumerate() {
        if columns[..i].contains(c) {
            return Err(AppError::config(format!("Column `{c}` is listed more than once.")));
        }
    }
    Ok(())
}

/// Fitted column transform; part of the persisted pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedColumnTransformer {
    encoders: Vec<TargetEncoder>,
    passthrough: Vec<Column>,
}

impl FittedColumnTransformer {
    pub fn n_features(&self) -> usize {
        self.encoders.len() + self.passthrough.len()
    }

    /// Output column names, in matrix order.
    pub fn feature_names(&self) -> Vec<String> {
        self.encoders
            .iter()
            .map(|e| format!("{}_encoded", e.column()))
            .chain(self.passthrough.iter().map(|c| c.name().to_string()))
            .collect()
    }

    pub fn encoders(&self) -> &[TargetEncoder] {
        &self.encoders
    }

    /// Produce the dense `rows × n_features` matrix fed to the regressor.
    pub fn transform(&self, x: &Table) -> Result<DMatrix<f64>, AppError> {
        let n_features = self.n_features();
        let mut out = DMatrix::<f64>::zeros(x.len(), n_features);

        for (row_idx, record) in x.rows().iter().enumerate() {
            for (j, encoder) in self.encoders.iter().enumerate() {
                let cell = record.cell(encoder.column());
                out[(row_idx, j)] = encoder.encode(&cell.category_key())?;
            }
            for (k, &column) in self.passthrough.iter().enumerate() {
                let Cell::Number(v) = record.cell(column) else {
                    return Err(AppError::inference(format!("Column `{column}` is not numeric.")));
                };
                out[(row_idx, self.encoders.len() + k)] = v;
            }
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PropertyRecord;

    fn record(kind: &str, sector: &str, area: f64) -> PropertyRecord {
        PropertyRecord {
            property_type: kind.to_string(),
            sector: sector.to_string(),
            net_usable_area: area,
            net_area: area * 1.2,
            n_rooms: 2.0,
            n_bathroom: 1.0,
            latitude: -33.4,
            longitude: -70.6,
            price: None,
        }
    }

    fn table() -> Table {
        Table::new(vec![
            record("casa", "vitacura", 100.0),
            record("departamento", "vitacura", 50.0),
            record("casa", "providencia", 80.0),
        ])
    }

    #[test]
    fn unlisted_columns_are_dropped() {
        let t = preprocessing(&["type", "sector"]).unwrap();
        let fitted = t.fit(&table(), &[10.0, 4.0, 8.0]).unwrap();
        let m = fitted.transform(&table()).unwrap();
        assert_eq!(m.shape(), (3, 2));
        assert_eq!(m[(0, 0)], 9.0); // casa: (10 + 8) / 2
        assert_eq!(m[(1, 1)], 7.0); // vitacura: (10 + 4) / 2
    }

    #[test]
    fn passthrough_columns_follow_encoded_ones() {
        let t = preprocessing(&["type"])
            .unwrap()
            .with_passthrough(vec![Column::NetUsableArea])
            .unwrap();
        let fitted = t.fit(&table(), &[10.0, 4.0, 8.0]).unwrap();
        assert_eq!(fitted.feature_names(), vec!["type_encoded", "net_usable_area"]);
        let m = fitted.transform(&table()).unwrap();
        assert_eq!(m[(1, 1)], 50.0);
    }

    #[test]
    fn unknown_column_name_fails_construction() {
        assert!(preprocessing(&["type", "garage"]).is_err());
    }

    #[test]
    fn duplicate_and_empty_lists_are_rejected() {
        assert!(preprocessing(&[]).is_err());
        assert!(preprocessing(&["sector", "sector"]).is_err());
        let t = preprocessing(&["type"]).unwrap();
        assert!(t.clone().with_passthrough(vec![Column::Sector]).is_err());
    }

    #[test]
    fn fit_rejects_mismatched_targets() {
        let t = preprocessing(&["type"]).unwrap();
        assert!(t.fit(&table(), &[1.0]).is_err());
        assert!(t.fit(&table(), &[1.0, f64::NAN, 2.0]).is_err());
    }
}
