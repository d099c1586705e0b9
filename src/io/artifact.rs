//! Read/write the persisted pipeline.
//!
//! The artifact is the JSON form of `fit::Pipeline`:
//! - metadata (format version, training time, feature names)
//! - fitted target encoders
//! - the boosted trees
//!
//! Writing replaces any existing file at the path in one rename.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::AppError;
use crate::fit::{ARTIFACT_FORMAT_VERSION, Pipeline};

/// Write a pipeline artifact, creating the parent directory if needed.
///
/// The JSON goes to a sibling `<name>.tmp` file that is renamed over `path`
/// once fully written, so a failed save leaves any previous artifact intact.
pub fn save_pipeline(path: &Path, pipeline: &Pipeline) -> Result<(), AppError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .map_err(|e| AppError::io(format!("Failed to create model directory '{}': {e}", dir.display())))?;
    }

    let tmp = temp_path(path);
    let result = write_json(&tmp, pipeline).and_then(|()| {
        fs::rename(&tmp, path).map_err(|e| {
            AppError::io(format!("Failed to move model file into place at '{}': {e}", path.display()))
        })
    });
    if result.is_err() && tmp.is_file() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

fn write_json(path: &Path, pipeline: &Pipeline) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::io(format!("Failed to create model file '{}': {e}", path.display())))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, pipeline)
        .map_err(|e| AppError::io(format!("Failed to write model file: {e}")))?;
    writer
        .flush()
        .map_err(|e| AppError::io(format!("Failed to write model file: {e}")))?;
    writer
        .get_ref()
        .sync_all()
        .map_err(|e| AppError::io(format!("Failed to sync model file: {e}")))
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Read a pipeline artifact.
pub fn load_pipeline(path: &Path) -> Result<Pipeline, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::io(format!("Failed to open model file '{}': {e}", path.display())))?;
    let pipeline: Pipeline = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| AppError::parse(format!("Invalid model file '{}': {e}", path.display())))?;

    let version = pipeline.meta().format_version;
    if version != ARTIFACT_FORMAT_VERSION {
        return Err(AppError::parse(format!(
            "Model file '{}' has format version {version}, expected {ARTIFACT_FORMAT_VERSION}.",
            path.display()
        )));
    }
    Ok(pipeline)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DEFAULT_CATEGORICAL;
    use crate::fit::{TrainingParams, create_pipeline};
    use crate::models::ModelParams;
    use crate::testing::synthetic_table;

    fn fitted(seed: u64) -> Pipeline {
        let (x, y) = synthetic_table(30, seed).split_target().unwrap();
        let params = TrainingParams {
            model: ModelParams {
                n_estimators: 5,
                ..ModelParams::default()
            },
            ..TrainingParams::default()
        };
        create_pipeline(&DEFAULT_CATEGORICAL, &params).unwrap().fit(&x, &y).unwrap()
    }

    #[test]
    fn save_replaces_artifact_and_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model_pipeline.json");
        save_pipeline(&path, &fitted(1)).unwrap();
        let second = fitted(2);
        save_pipeline(&path, &second).unwrap();

        assert_eq!(load_pipeline(&path).unwrap(), second);
        assert!(!dir.path().join("model_pipeline.json.tmp").exists());
    }

    #[test]
    fn failed_save_keeps_previous_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model_pipeline.json");
        let first = fitted(3);
        save_pipeline(&path, &first).unwrap();

        // A directory squatting on the temp name makes the write fail.
        fs::create_dir(dir.path().join("model_pipeline.json.tmp")).unwrap();
        assert!(save_pipeline(&path, &fitted(4)).is_err());

        assert_eq!(load_pipeline(&path).unwrap(), first);
        assert!(dir.path().join("model_pipeline.json.tmp").is_dir());
    }

    #[test]
    fn wrong_format_version_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.json");
        save_pipeline(&path, &fitted(5)).unwrap();
        let mut value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        value["meta"]["format_version"] = serde_json::json!(ARTIFACT_FORMAT_VERSION + 1);
        fs::write(&path, value.to_string()).unwrap();

        let err = load_pipeline(&path).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Parse);
    }
}
