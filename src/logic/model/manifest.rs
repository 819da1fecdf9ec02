//! Model manifest - optional JSON sidecar next to the model file
//!
//! ```json
//! { "n_features_in": 30, "feature_names": ["V1", "V2", "...", "scaled_amount"] }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::ModelError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelManifest {
    #[serde(default)]
    pub n_features_in: Option<usize>,

    #[serde(default)]
    pub feature_names: Option<Vec<String>>,
}

impl ModelManifest {
    /// Default sidecar location: `<model file>.json`
    pub fn default_path(model_path: &Path) -> PathBuf {
        let mut name = model_path.as_os_str().to_os_string();
        name.push(".json");
        PathBuf::from(name)
    }

    /// Load a manifest. A missing file is not an error.
    pub fn load(path: &Path) -> Result<Option<Self>, ModelError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ModelError::Load(format!("Failed to read {}: {}", path.display(), e)))?;
        let manifest: Self = serde_json::from_str(&content)
            .map_err(|e| ModelError::Load(format!("Invalid manifest {}: {}", path.display(), e)))?;

        manifest.validate()?;
        tracing::info!("Model manifest loaded from {}", path.display());
        Ok(Some(manifest))
    }

    fn validate(&self) -> Result<(), ModelError> {
        if let (Some(count), Some(names)) = (self.n_features_in, &self.feature_names) {
            if count != names.len() {
                return Err(ModelError::Load(format!(
                    "Manifest declares {} features but lists {} names",
                    count,
                    names.len()
                )));
            }
        }
        Ok(())
    }

    /// Expected feature count: declared count, then the number of declared names
    pub fn declared_feature_count(&self) -> Option<usize> {
        self.n_features_in
            .or_else(|| self.feature_names.as_ref().map(Vec::len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_path_appends_json() {
        let path = ModelManifest::default_path(Path::new("/opt/app/rf_model.onnx"));
        assert_eq!(path, PathBuf::from("/opt/app/rf_model.onnx.json"));
    }

    #[test]
    fn test_missing_manifest_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = ModelManifest::load(&dir.path().join("absent.json")).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_load_names_only() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"feature_names": ["f1", "scaled_amount"]}}"#).unwrap();

        let manifest = ModelManifest::load(file.path()).unwrap().unwrap();
        assert_eq!(manifest.declared_feature_count(), Some(2));
    }

    #[test]
    fn test_inconsistent_manifest_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"n_features_in": 3, "feature_names": ["a"]}}"#).unwrap();

        let err = ModelManifest::load(file.path()).unwrap_err();
        assert!(matches!(err, ModelError::Load(_)));
    }

    #[test]
    fn test_malformed_manifest_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        assert!(ModelManifest::load(file.path()).is_err());
    }
}
