//! CSV ingest.
//!
//! Turns a property CSV (header row + one record per line) into a `Table`.
//!
//! - headers are matched case-insensitively, a UTF-8 BOM is stripped
//! - columns outside the schema (e.g. `id`) are ignored
//! - the first malformed row fails the whole load; there is no partial table

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;
use tracing::{error, info};

use crate::domain::{PropertyRecord, Table};
use crate::error::AppError;

/// Load the training table from a CSV file.
pub fn load_train_data(path: &Path) -> Result<Table, AppError> {
    load_csv("training", path)
}

/// Load the held-out test table from a CSV file.
pub fn load_test_data(path: &Path) -> Result<Table, AppError> {
    load_csv("test", path)
}

/// Load unlabeled rows for batch prediction.
pub fn load_input_data(path: &Path) -> Result<Table, AppError> {
    load_csv("input", path)
}

fn load_csv(label: &str, path: &Path) -> Result<Table, AppError> {
    info!("Loading {label} data from {}...", path.display());
    let result = File::open(path)
        .map_err(|e| AppError::io(format!("Failed to open CSV '{}': {e}", path.display())))
        .and_then(read_table);

    match result {
        Ok(table) => {
            info!("{} {label} rows loaded successfully.", table.len());
            Ok(table)
        }
        Err(e) => {
            error!("Error loading {label} data: {e}");
            Err(e)
        }
    }
}

/// Parse CSV text from any reader into a `Table`.
pub fn read_table<R: Read>(input: R) -> Result<Table, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(input);

    let headers = reader
        .headers()
        .map_err(|e| AppError::parse(format!("Failed to read CSV headers: {e}")))?
        .clone();
    reader.set_headers(normalize_headers(&headers));

    let mut rows = Vec::new();
    for (idx, result) in reader.deserialize::<PropertyRecord>().enumerate() {
        // +2: records start after the header and lines are 1-based.
        let line = idx + 2;
        let record = result.map_err(|e| AppError::parse(format!("CSV line {line}: {e}")))?;
        rows.push(record);
    }

    Ok(Table::new(rows))
}

fn normalize_headers(headers: &StringRecord) -> StringRecord {
    headers
        .iter()
        .map(|name| name.trim().trim_start_matches('\u{feff}').to_ascii_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const HEADER: &str = "id,type,sector,net_usable_area,net_area,n_rooms,n_bathroom,latitude,longitude,price";

    #[test]
    fn reads_rows_and_ignores_extra_columns() {
        let csv = format!(
            "{HEADER}\n1,casa,vitacura,152.0,257.0,3,3,-33.3794,-70.5447,11900\n2,departamento,las condes,60,70,2,1,-33.41,-70.58,4200\n"
        );
        let table = read_table(csv.as_bytes()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[0].property_type, "casa");
        assert_eq!(table.rows()[1].price, Some(4200.0));
    }

    #[test]
    fn price_column_is_optional() {
        let csv = "type,sector,net_usable_area,net_area,n_rooms,n_bathroom,latitude,longitude\ncasa,la reina,100,120,3,2,-33.45,-70.54\n";
        let table = read_table(csv.as_bytes()).unwrap();
        assert_eq!(table.rows()[0].price, None);
    }

    #[test]
    fn headers_are_normalized() {
        let csv = "\u{feff}Type,SECTOR,net_usable_area,net_area,n_rooms,n_bathroom,Latitude,Longitude\ncasa,la reina,100,120,3,2,-33.45,-70.54\n";
        let table = read_table(csv.as_bytes()).unwrap();
        assert_eq!(table.rows()[0].sector, "la reina");
    }

    #[test]
    fn missing_column_is_a_parse_error() {
        let csv = "type,sector,net_usable_area,net_area,n_rooms,n_bathroom,latitude\ncasa,la reina,100,120,3,2,-33.45\n";
        let err = read_table(csv.as_bytes()).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Parse);
        assert!(err.to_string().contains("longitude"));
    }

    #[test]
    fn bad_number_reports_line() {
        let csv = format!("{HEADER}\n1,casa,vitacura,big,257.0,3,3,-33.3794,-70.5447,11900\n");
        let err = read_table(csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("line 2"), "{err}");
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_train_data(&dir.path().join("nope.csv")).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Io);
    }

    #[test]
    fn loads_test_data_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{HEADER}").unwrap();
        writeln!(file, "7,casa,providencia,90,100,2,2,-33.43,-70.61,6000").unwrap();
        let table = load_test_data(file.path()).unwrap();
        assert_eq!(table.len(), 1);
    }
}
