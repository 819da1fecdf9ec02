//! Configuration module

use std::env;
use std::path::{Path, PathBuf};

pub const DEFAULT_MODEL_FILE: &str = "rf_model.onnx";
pub const DEFAULT_PREVIEW_ROWS: usize = 50;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,

    /// ONNX model file
    pub model_path: PathBuf,

    /// Optional JSON sidecar with feature count / names
    pub manifest_path: PathBuf,

    /// Rows included in the JSON preview
    pub preview_rows: usize,

    /// Upload body limit in bytes
    pub max_upload_bytes: usize,

    /// ONNX Runtime intra-op threads
    pub onnx_threads: usize,

    /// Emit JSON log lines instead of human-readable ones
    pub json_logs: bool,

    /// Environment (development, production)
    pub environment: String,
}

impl Default for Config {
    fn default() -> Self {
        let model_path = default_model_path();
        Self {
            port: 8080,
            manifest_path: crate::logic::model::ModelManifest::default_path(&model_path),
            model_path,
            preview_rows: DEFAULT_PREVIEW_ROWS,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            onnx_threads: 1,
            json_logs: false,
            environment: "development".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let model_path = lookup("MODEL_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.model_path);

        let manifest_path = lookup("MODEL_MANIFEST")
            .map(PathBuf::from)
            .unwrap_or_else(|| crate::logic::model::ModelManifest::default_path(&model_path));

        Self {
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),

            model_path,
            manifest_path,

            preview_rows: lookup("PREVIEW_ROWS")
                .and_then(|n| n.parse().ok())
                .unwrap_or(defaults.preview_rows),

            max_upload_bytes: lookup("MAX_UPLOAD_BYTES")
                .and_then(|n| n.parse().ok())
                .unwrap_or(defaults.max_upload_bytes),

            onnx_threads: lookup("ONNX_THREADS")
                .and_then(|n| n.parse().ok())
                .filter(|&n| n > 0)
                .unwrap_or(defaults.onnx_threads),

            json_logs: lookup("LOG_FORMAT")
                .map(|f| f.eq_ignore_ascii_case("json"))
                .unwrap_or(defaults.json_logs),

            environment: lookup("ENVIRONMENT").unwrap_or(defaults.environment),
        }
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

/// Model file next to the executable, falling back to the working directory
fn default_model_path() -> PathBuf {
    env::current_exe()
        .ok()
        .as_deref()
        .and_then(Path::parent)
        .map(|dir| dir.join(DEFAULT_MODEL_FILE))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);
        assert_eq!(config.port, 8080);
        assert_eq!(config.preview_rows, 50);
        assert!(config.model_path.ends_with(DEFAULT_MODEL_FILE));
        assert!(config.manifest_path.ends_with("rf_model.onnx.json"));
        assert!(!config.is_production());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("PORT", "9000"),
            ("MODEL_PATH", "/srv/models/fraud.onnx"),
            ("PREVIEW_ROWS", "10"),
            ("ONNX_THREADS", "0"),
            ("LOG_FORMAT", "JSON"),
            ("ENVIRONMENT", "production"),
        ]);

        assert_eq!(config.port, 9000);
        assert_eq!(config.model_path, PathBuf::from("/srv/models/fraud.onnx"));
        assert_eq!(config.manifest_path, PathBuf::from("/srv/models/fraud.onnx.json"));
        assert_eq!(config.preview_rows, 10);
        assert_eq!(config.onnx_threads, 1);
        assert!(config.json_logs);
        assert!(config.is_production());
    }

    #[test]
    fn test_invalid_numbers_fall_back() {
        let config = config_from(&[("PORT", "http"), ("MAX_UPLOAD_BYTES", "-1")]);
        assert_eq!(config.port, 8080);
        assert_eq!(config.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
    }
}
