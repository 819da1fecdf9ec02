//! Inference Runner
//!
//! Builds the feature matrix from the working table, calls the classifier
//! once for labels and once for probabilities, and appends both as columns
//! on a copy of the working table.

use ndarray::Array2;
use thiserror::Error;

use crate::logic::model::{Classifier, ModelError};
use crate::models::{Column, Table, TableError};

pub const PREDICTION_COLUMN: &str = "Fraud Prediction";
pub const PROBABILITY_COLUMN: &str = "Fraud Probability";

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Uploaded CSV is missing model features: {}", .missing.join(", "))]
    FeatureNameMismatch { missing: Vec<String> },

    #[error("Input cannot be passed to the model: {0}")]
    InvalidInput(TableError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("Model returned {found} {output} for {expected} rows")]
    RowCountMismatch {
        output: &'static str,
        expected: usize,
        found: usize,
    },
}

/// Numeric view of the working table in the order the model consumes.
///
/// When the model declares its training column names, columns are aligned by
/// name; otherwise the table's own column order is trusted.
pub fn feature_matrix(working: &Table, model: &dyn Classifier) -> Result<Array2<f32>, InferenceError> {
    let matrix = match model.feature_names() {
        Some(names) => {
            let aligned = working.select(names).map_err(|e| match e {
                TableError::MissingColumns(missing) => {
                    InferenceError::FeatureNameMismatch { missing }
                }
                other => InferenceError::InvalidInput(other),
            })?;
            aligned.to_matrix()
        }
        None => working.to_matrix(),
    };
    matrix.map_err(InferenceError::InvalidInput)
}

/// Run the classifier and return the result table.
/// Row `i` of the result corresponds to row `i` of `working`.
pub fn infer(working: &Table, model: &dyn Classifier) -> Result<Table, InferenceError> {
    let matrix = feature_matrix(working, model)?;
    let rows = matrix.nrows();

    let labels = model.predict(&matrix)?;
    if labels.len() != rows {
        return Err(InferenceError::RowCountMismatch {
            output: "labels",
            expected: rows,
            found: labels.len(),
        });
    }

    let probabilities = model.predict_proba(&matrix)?;
    if probabilities.nrows() != rows {
        return Err(InferenceError::RowCountMismatch {
            output: "probability rows",
            expected: rows,
            found: probabilities.nrows(),
        });
    }
    if probabilities.ncols() < 2 {
        return Err(ModelError::Output(format!(
            "expected [P(class0), P(class1)] per row, got {} columns",
            probabilities.ncols()
        ))
        .into());
    }

    let mut result = working.clone();
    let predictions = Column::numeric(PREDICTION_COLUMN, labels.iter().map(|&l| l as f64).collect());
    let fraud_probability = Column::numeric(PROBABILITY_COLUMN, probabilities.column(1).to_vec());
    result
        .push_column(predictions)
        .map_err(InferenceError::InvalidInput)?;
    result
        .push_column(fraud_probability)
        .map_err(InferenceError::InvalidInput)?;

    tracing::debug!(rows, "Inference completed");
    Ok(result)
}
