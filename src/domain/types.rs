//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - read straight from CSV rows or query results
//! - fed through the preprocessing + boosting pipeline
//! - exported again alongside predictions

use std::borrow::Cow;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::fit::TrainingParams;

/// Name of the target column in training/test data.
pub const TARGET_COLUMN: &str = "price";

/// Categorical columns the production model is trained with.
pub const DEFAULT_CATEGORICAL: [Column; 2] = [Column::Type, Column::Sector];

/// Whether a column holds labels or numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Categorical,
    Numeric,
}

/// One of the eight feature columns of a property record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    Type,
    Sector,
    NetUsableArea,
    NetArea,
    NRooms,
    NBathroom,
    Latitude,
    Longitude,
}

impl Column {
    pub const ALL: [Column; 8] = [
        Column::Type,
        Column::Sector,
        Column::NetUsableArea,
        Column::NetArea,
        Column::NRooms,
        Column::NBathroom,
        Column::Latitude,
        Column::Longitude,
    ];

    /// Numeric feature columns, in schema order.
    pub const NUMERIC: [Column; 6] = [
        Column::NetUsableArea,
        Column::NetArea,
        Column::NRooms,
        Column::NBathroom,
        Column::Latitude,
        Column::Longitude,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Column::Type => "type",
            Column::Sector => "sector",
            Column::NetUsableArea => "net_usable_area",
            Column::NetArea => "net_area",
            Column::NRooms => "n_rooms",
            Column::NBathroom => "n_bathroom",
            Column::Latitude => "latitude",
            Column::Longitude => "longitude",
        }
    }

    pub fn kind(self) -> ColumnKind {
        match self {
            Column::Type | Column::Sector => ColumnKind::Categorical,
            _ => ColumnKind::Numeric,
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Column {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().trim_start_matches('\u{feff}');
        Column::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| AppError::config(format!("Unknown column `{wanted}`.")))
    }
}

/// Parse a comma-separated column list such as `type,sector`.
pub fn parse_column_list(s: &str) -> Result<Vec<Column>, AppError> {
    s.split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(Column::from_str)
        .collect()
}

/// A single cell, borrowed from a record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cell<'a> {
    Label(&'a str),
    Number(f64),
}

impl Cell<'_> {
    /// Key used when the cell is treated as a category.
    ///
    /// Numbers are keyed by their shortest round-trip representation so a
    /// numeric column can be target-encoded as well.
    pub fn category_key(&self) -> Cow<'_, str> {
        match self {
            Cell::Label(s) => Cow::Borrowed(*s),
            Cell::Number(v) => Cow::Owned(v.to_string()),
        }
    }
}

/// One property observation.
///
/// `price` is only present in training/test data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyRecord {
    #[serde(rename = "type")]
    pub property_type: String,
    pub sector: String,
    pub net_usable_area: f64,
    pub net_area: f64,
    pub n_rooms: f64,
    pub n_bathroom: f64,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
}

impl PropertyRecord {
    pub fn cell(&self, column: Column) -> Cell<'_> {
        match column {
            Column::Type => Cell::Label(&self.property_type),
            Column::Sector => Cell::Label(&self.sector),
            Column::NetUsableArea => Cell::Number(self.net_usable_area),
            Column::NetArea => Cell::Number(self.net_area),
            Column::NRooms => Cell::Number(self.n_rooms),
            Column::NBathroom => Cell::Number(self.n_bathroom),
            Column::Latitude => Cell::Number(self.latitude),
            Column::Longitude => Cell::Number(self.longitude),
        }
    }

    /// Numeric value of a column; label columns have none.
    pub fn number(&self, column: Column) -> Option<f64> {
        match self.cell(column) {
            Cell::Number(v) => Some(v),
            Cell::Label(_) => None,
        }
    }
}

/// An ordered sequence of records sharing the property schema.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    rows: Vec<PropertyRecord>,
}

impl Table {
    pub fn new(rows: Vec<PropertyRecord>) -> Self {
        Self { rows }
    }

    /// A one-row table, the shape used for online inference.
    pub fn single(record: PropertyRecord) -> Self {
        Self { rows: vec![record] }
    }

    pub fn rows(&self) -> &[PropertyRecord] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterate one column as cells.
    pub fn column(&self, column: Column) -> impl Iterator<Item = Cell<'_>> + '_ {
        self.rows.iter().map(move |r| r.cell(column))
    }

    /// Extract the `price` target, failing on the first row without one.
    pub fn targets(&self) -> Result<Vec<f64>, AppError> {
        self.rows
            .iter()
            .enumerate()
            .map(|(idx, r)| {
                r.price.ok_or_else(|| {
                    AppError::parse(format!("Row {} has no `{TARGET_COLUMN}` value.", idx + 1))
                })
            })
            .collect()
    }

    /// Split into a feature table (targets stripped) and the target vector.
    pub fn split_target(self) -> Result<(Table, Vec<f64>), AppError> {
        let y = self.targets()?;
        let rows = self
            .rows
            .into_iter()
            .map(|mut r| {
                r.price = None;
                r
            })
            .collect();
        Ok((Table { rows }, y))
    }
}

impl FromIterator<PropertyRecord> for Table {
    fn from_iter<I: IntoIterator<Item = PropertyRecord>>(iter: I) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}

/// Where a training or test table comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum DataSource {
    Csv(PathBuf),
    /// SQLite database file plus a read query.
    Query { db: PathBuf, sql: String },
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::Csv(path) => write!(f, "{}", path.display()),
            DataSource::Query { db, sql } => write!(f, "{} ({sql})", db.display()),
        }
    }
}

/// Everything a `propval train` run needs.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub train: DataSource,
    pub test: DataSource,
    pub artifact_path: PathBuf,
    pub categorical: Vec<Column>,
    /// Regressor, encoder and passthrough settings.
    pub params: TrainingParams,
    pub export_predictions: Option<PathBuf>,
    pub export_metrics: Option<PathBuf>,
}
