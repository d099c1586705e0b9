//! Relational ingest via SQLite.
//!
//! A connection is opened per call, used for one read query and always closed
//! before returning, whether the query succeeded or not. No pooling: this is
//! for batch/offline loads only.

use std::collections::HashMap;
use std::path::Path;

use rusqlite::types::Value;
use rusqlite::{Connection, OpenFlags};
use tracing::{error, info, warn};

use crate::domain::{Column, ColumnKind, PropertyRecord, TARGET_COLUMN, Table};
use crate::error::AppError;

/// Raw SQL value as returned by the driver.
pub type SqlValue = Value;

/// Execute a read query and return every row as raw values.
pub fn load_data_from_db(db: &Path, query: &str) -> Result<Vec<Vec<SqlValue>>, AppError> {
    with_connection(db, |conn| {
        let mut stmt = conn
            .prepare(query)
            .map_err(|e| AppError::parse(format!("Invalid query: {e}")))?;
        let width = stmt.column_count();
        let rows = stmt
            .query_map([], |row| (0..width).map(|i| row.get::<_, Value>(i)).collect::<rusqlite::Result<Vec<Value>>>())
            .map_err(|e| AppError::io(format!("Query failed: {e}")))?;
        let data = rows
            .collect::<Result<Vec<Vec<Value>>, _>>()
            .map_err(|e| AppError::io(format!("Failed to fetch rows: {e}")))?;
        Ok(data)
    })
}

/// Execute a read query and map its columns by name onto property records.
pub fn load_table_from_db(db: &Path, query: &str) -> Result<Table, AppError> {
    let (names, rows) = with_connection(db, |conn| {
        let mut stmt = conn
            .prepare(query)
            .map_err(|e| AppError::parse(format!("Invalid query: {e}")))?;
        let names: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(|n| n.to_ascii_lowercase())
            .collect();
        let width = names.len();
        let rows = stmt
            .query_map([], |row| (0..width).map(|i| row.get::<_, Value>(i)).collect::<rusqlite::Result<Vec<Value>>>())
            .map_err(|e| AppError::io(format!("Query failed: {e}")))?
            .collect::<Result<Vec<Vec<Value>>, _>>()
            .map_err(|e| AppError::io(format!("Failed to fetch rows: {e}")))?;
        Ok((names, rows))
    })?;

    let index: HashMap<&str, usize> = names.iter().enumerate().map(|(i, n)| (n.as_str(), i)).collect();
    for column in Column::ALL {
        if !index.contains_key(column.name()) {
            return Err(AppError::parse(format!("Query result has no `{column}` column.")));
        }
    }

    rows.iter()
        .enumerate()
        .map(|(idx, row)| {
            record_from_row(&index, row).map_err(|e| AppError::parse(format!("Query row {}: {e}", idx + 1)))
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Table::new)
}

fn with_connection<T>(
    db: &Path,
    f: impl FnOnce(&Connection) -> Result<T, AppError>,
) -> Result<T, AppError> {
    info!("Opening database {}", db.display());
    let conn = Connection::open_with_flags(db, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .map_err(|e| AppError::io(format!("Failed to open database '{}': {e}", db.display())))
        .inspect_err(|e| error!("{e}"))?;

    let result = f(&conn);
    if let Err((_, e)) = conn.close() {
        warn!("Failed to close database {}: {e}", db.display());
    }

    match &result {
        Ok(_) => info!("Database query completed, connection closed."),
        Err(e) => error!("Error querying database: {e}"),
    }
    result
}

fn record_from_row(index: &HashMap<&str, usize>, row: &[Value]) -> Result<PropertyRecord, String> {
    let label = |c: Column| -> Result<String, String> {
        match &row[index[c.name()]] {
            Value::Text(s) => Ok(s.clone()),
            Value::Integer(v) => Ok(v.to_string()),
            Value::Real(v) => Ok(v.to_string()),
            other => Err(format!("`{c}` must be text, got {other:?}")),
        }
    };
    let number = |name: &str| -> Result<Option<f64>, String> {
        let Some(&i) = index.get(name) else {
            return Ok(None);
        };
        match &row[i] {
            Value::Null => Ok(None),
            Value::Integer(v) => Ok(Some(*v as f64)),
            Value::Real(v) => Ok(Some(*v)),
            Value::Text(s) => s
                .trim()
                .parse::<f64>()
                .map(Some)
                .map_err(|_| format!("`{name}` is not a number: '{s}'")),
            Value::Blob(_) => Err(format!("`{name}` is a blob")),
        }
    };
    let required = |c: Column| -> Result<f64, String> {
        debug_assert_eq!(c.kind(), ColumnKind::Numeric);
        number(c.name())?.ok_or_else(|| format!("`{c}` is NULL"))
    };

    Ok(PropertyRecord {
        property_type: label(Column::Type)?,
        sector: label(Column::Sector)?,
        net_usable_area: required(Column::NetUsableArea)?,
        net_area: required(Column::NetArea)?,
        n_rooms: required(Column::NRooms)?,
        n_bathroom: required(Column::NBathroom)?,
        latitude: required(Column::Latitude)?,
        longitude: required(Column::Longitude)?,
        price: number(TARGET_COLUMN)?,
    })
}
