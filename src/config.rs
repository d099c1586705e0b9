//! Runtime configuration.
//!
//! Secrets and deployment settings come from the environment (a `.env` file
//! is loaded first when present); CLI flags override them.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::error::AppError;
use crate::fit::TrainingParams;

pub const DEFAULT_MODEL_PATH: &str = "model/model_pipeline.json";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
pub const DEFAULT_API_KEY_HEADER: &str = "api_key";
pub const DEFAULT_LOG_DIR: &str = "logs";

/// Settings for `propval serve`.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub api_key: String,
    pub api_key_header: String,
    pub model_path: PathBuf,
    pub bind_addr: String,
    pub log_dir: PathBuf,
}

impl ServiceConfig {
    /// Read from the process environment. `API_KEY` is required.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let api_key = var("API_KEY")
            .ok_or_else(|| AppError::config("Missing API_KEY in environment (.env)."))?;
        Ok(Self {
            api_key,
            api_key_header: var("API_KEY_HEADER").unwrap_or_else(|| DEFAULT_API_KEY_HEADER.to_string()),
            model_path: var("MODEL_PATH").map_or_else(|| PathBuf::from(DEFAULT_MODEL_PATH), PathBuf::from),
            bind_addr: var("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            log_dir: var("LOG_DIR").map_or_else(|| PathBuf::from(DEFAULT_LOG_DIR), PathBuf::from),
        })
    }
}

/// Read a hyperparameter file; omitted keys keep their defaults.
pub fn load_params(path: &Path) -> Result<TrainingParams, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::io(format!("Failed to open params file '{}': {e}", path.display())))?;
    let params: TrainingParams = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| AppError::config(format!("Invalid params file '{}': {e}", path.display())))?;
    params.model.validate()?;
    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_apply_when_only_key_is_set() {
        let cfg = ServiceConfig::from_lookup(lookup(&[("API_KEY", "k")])).unwrap();
        assert_eq!(cfg.api_key, "k");
        assert_eq!(cfg.api_key_header, "api_key");
        assert_eq!(cfg.model_path, PathBuf::from(DEFAULT_MODEL_PATH));
        assert_eq!(cfg.bind_addr, "0.0.0.0:8000");
        assert_eq!(cfg.log_dir, PathBuf::from("logs"));
    }

    #[test]
    fn missing_or_blank_key_is_config_error() {
        for vars in [&[][..], &[("API_KEY", "  ")][..]] {
            let err = ServiceConfig::from_lookup(lookup(vars)).unwrap_err();
            assert_eq!(err.kind(), crate::error::ErrorKind::Config);
        }
    }

    #[test]
    fn overrides_are_read() {
        let cfg = ServiceConfig::from_lookup(lookup(&[
            ("API_KEY", "k"),
            ("API_KEY_HEADER", "x-api-key"),
            ("MODEL_PATH", "/tmp/m.json"),
            ("BIND_ADDR", "127.0.0.1:9000"),
        ]))
        .unwrap();
        assert_eq!(cfg.api_key_header, "x-api-key");
        assert_eq!(cfg.model_path, PathBuf::from("/tmp/m.json"));
        assert_eq!(cfg.bind_addr, "127.0.0.1:9000");
    }

    #[test]
    fn params_file_is_validated() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.json");
        std::fs::write(&good, r#"{"model": {"n_estimators": 50}}"#).unwrap();
        assert_eq!(load_params(&good).unwrap().model.n_estimators, 50);

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, r#"{"model": {"subsample": 0.0}}"#).unwrap();
        assert!(load_params(&bad).is_err());
    }
}
