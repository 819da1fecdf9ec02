//! ONNX classifier - ONNX Runtime backed model handle
//!
//! Expects a scikit-learn classifier exported with ZipMap disabled:
//! an int64 `label` output and a float `probabilities` output of shape `[N, 2]`.

use std::path::Path;

use ndarray::{Array1, Array2};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use parking_lot::Mutex;

use super::{Classifier, ModelError, ModelInfo, ModelManifest};

pub struct OnnxClassifier {
    source: String,
    /// `Session::run` needs `&mut`
    session: Mutex<Session>,
    input_name: String,
    label_output: String,
    proba_output: String,
    outputs: Vec<String>,
    n_features: usize,
    feature_names: Option<Vec<String>>,
}

impl OnnxClassifier {
    /// Load a model file, using the manifest for feature count and names when given
    pub fn load(
        path: &Path,
        manifest: Option<ModelManifest>,
        threads: usize,
    ) -> Result<Self, ModelError> {
        tracing::info!("Loading ONNX model from: {}", path.display());

        if !path.exists() {
            return Err(ModelError::Load(format!("Model not found: {}", path.display())));
        }

        let session = Session::builder()
            .map_err(|e| ModelError::Load(format!("Failed to create session builder: {}", e)))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| ModelError::Load(format!("Failed to set optimization: {}", e)))?
            .with_intra_threads(threads)
            .map_err(|e| ModelError::Load(format!("Failed to set threads: {}", e)))?
            .commit_from_file(path)
            .map_err(|e| ModelError::Load(format!("Failed to load model: {}", e)))?;

        let input = session
            .inputs()
            .first()
            .ok_or_else(|| ModelError::Load("Model declares no inputs".to_string()))?;
        let input_name = input.name().to_string();
        let input_width = input
            .dtype()
            .tensor_shape()
            .and_then(|shape| shape.last().copied());

        let outputs: Vec<String> = session
            .outputs()
            .iter()
            .map(|o| o.name().to_string())
            .collect();
        let (label_output, proba_output) = resolve_outputs(&outputs)?;

        let manifest = manifest.unwrap_or_default();
        let n_features = resolve_feature_count(&manifest, input_width)?;

        tracing::info!(
            input = %input_name,
            label = %label_output,
            probabilities = %proba_output,
            n_features,
            "ONNX model loaded successfully"
        );

        Ok(Self {
            source: path.display().to_string(),
            session: Mutex::new(session),
            input_name,
            label_output,
            proba_output,
            outputs,
            n_features,
            feature_names: manifest.feature_names,
        })
    }

    fn input_tensor(features: &Array2<f32>) -> Result<Tensor<f32>, ModelError> {
        let shape = vec![features.nrows() as i64, features.ncols() as i64];
        let data: Vec<f32> = features.iter().copied().collect();
        Tensor::from_array((shape, data))
            .map_err(|e| ModelError::Runtime(format!("Tensor error: {}", e)))
    }
}

impl Classifier for OnnxClassifier {
    fn n_features_in(&self) -> usize {
        self.n_features
    }

    fn feature_names(&self) -> Option<&[String]> {
        self.feature_names.as_deref()
    }

    fn predict(&self, features: &Array2<f32>) -> Result<Array1<i64>, ModelError> {
        if features.nrows() == 0 {
            return Ok(Array1::zeros(0));
        }

        let input = Self::input_tensor(features)?;
        let mut session = self.session.lock();
        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => input])
            .map_err(|e| ModelError::Runtime(format!("Inference failed: {}", e)))?;

        let output = outputs
            .get(self.label_output.as_str())
            .ok_or_else(|| ModelError::Output(format!("missing output '{}'", self.label_output)))?;
        let (_, labels) = output.try_extract_tensor::<i64>().map_err(|e| {
            ModelError::Output(format!("'{}' is not an int64 tensor: {}", self.label_output, e))
        })?;

        Ok(Array1::from(labels.to_vec()))
    }

    fn predict_proba(&self, features: &Array2<f32>) -> Result<Array2<f64>, ModelError> {
        let rows = features.nrows();
        if rows == 0 {
            return Ok(Array2::zeros((0, 2)));
        }

        let input = Self::input_tensor(features)?;
        let mut session = self.session.lock();
        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => input])
            .map_err(|e| ModelError::Runtime(format!("Inference failed: {}", e)))?;

        let output = outputs
            .get(self.proba_output.as_str())
            .ok_or_else(|| ModelError::Output(format!("missing output '{}'", self.proba_output)))?;
        let (_, data) = output.try_extract_tensor::<f32>().map_err(|e| {
            ModelError::Output(format!(
                "'{}' is not a float tensor (export with zipmap disabled): {}",
                self.proba_output, e
            ))
        })?;

        if data.len() % rows != 0 {
            return Err(ModelError::Output(format!(
                "{} probabilities cannot be split over {} rows",
                data.len(),
                rows
            )));
        }
        let classes = data.len() / rows;
        Array2::from_shape_vec((rows, classes), data.iter().map(|&p| f64::from(p)).collect())
            .map_err(|e| ModelError::Output(format!("Array error: {}", e)))
    }

    fn info(&self) -> ModelInfo {
        ModelInfo {
            source: self.source.clone(),
            n_features_in: self.n_features,
            feature_names: self.feature_names.clone(),
            outputs: self.outputs.clone(),
        }
    }
}

// ============================================================================
// HELPERS
// ============================================================================

/// Pick (label, probabilities) output names.
/// Label: first name containing "label", else the first output.
/// Probabilities: first name containing "prob", else the last output.
fn resolve_outputs(names: &[String]) -> Result<(String, String), ModelError> {
    if names.len() < 2 {
        return Err(ModelError::Load(format!(
            "Model must expose label and probability outputs, found {:?}",
            names
        )));
    }

    let label = names
        .iter()
        .find(|n| n.contains("label"))
        .unwrap_or(&names[0])
        .clone();
    let proba = names
        .iter()
        .find(|n| n.contains("prob"))
        .unwrap_or(&names[names.len() - 1])
        .clone();

    if label == proba {
        return Err(ModelError::Load(format!(
            "Cannot tell label and probability outputs apart in {:?}",
            names
        )));
    }
    Ok((label, proba))
}

/// Manifest wins; otherwise the model's static input width. Dynamic widths (-1) don't count.
fn resolve_feature_count(
    manifest: &ModelManifest,
    input_width: Option<i64>,
) -> Result<usize, ModelError> {
    if let Some(count) = manifest.declared_feature_count() {
        if count > 0 {
            return Ok(count);
        }
    }

    match input_width {
        Some(width) if width > 0 => Ok(width as usize),
        _ => Err(ModelError::Load(
            "Model input width is dynamic; declare n_features_in in the model manifest"
                .to_string(),
        )),
    }
}
