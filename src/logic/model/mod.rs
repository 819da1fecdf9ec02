//! Model Module - classifier handle
//!
//! The request path only sees the `Classifier` trait, so the ONNX backend can
//! be swapped without touching reconciliation or inference.

pub mod manifest;
pub mod onnx;

use ndarray::{Array1, Array2};
use serde::Serialize;
use thiserror::Error;

pub use manifest::ModelManifest;
pub use onnx::OnnxClassifier;

// ============================================================================
// ERROR HANDLING
// ============================================================================

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModelError {
    #[error("Model load failed: {0}")]
    Load(String),

    #[error("Model runtime error: {0}")]
    Runtime(String),

    #[error("Unexpected model output: {0}")]
    Output(String),
}

// ============================================================================
// CLASSIFIER TRAIT
// ============================================================================

/// Description of the loaded model for status endpoints
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub source: String,
    pub n_features_in: usize,
    pub feature_names: Option<Vec<String>>,
    pub outputs: Vec<String>,
}

/// Pre-trained binary classifier.
///
/// Loaded once at startup and shared read-only between requests.
pub trait Classifier: Send + Sync {
    /// Number of input columns the model was trained on
    fn n_features_in(&self) -> usize;

    /// Training column order, when the artifact declares it
    fn feature_names(&self) -> Option<&[String]> {
        None
    }

    /// Class label (0 or 1) per row
    fn predict(&self, features: &Array2<f32>) -> Result<Array1<i64>, ModelError>;

    /// `[P(class 0), P(class 1)]` per row
    fn predict_proba(&self, features: &Array2<f32>) -> Result<Array2<f64>, ModelError>;

    fn info(&self) -> ModelInfo;
}
