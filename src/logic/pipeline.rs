//! Request pipeline - upload to summarized result
//!
//! ```text
//! NoFile → Uploaded → Reconciled → Inferred → Summarized → Rendered
//!              └───────────┴───────────┴──→ Failed
//! ```
//!
//! Linear and synchronous. A failure halts the request; nothing partial is returned.

use serde::Serialize;
use thiserror::Error;

use crate::logic::inference::{self, InferenceError};
use crate::logic::model::Classifier;
use crate::logic::reconcile::{self, Notice, ReconcileError};
use crate::logic::summary::{self, Summary};
use crate::models::{Table, TableError};

/// Pipeline state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    NoFile,
    Uploaded,
    Reconciled,
    Inferred,
    Summarized,
    Rendered,
    Failed,
}

/// Per-request failure. `kind()` is the stable machine-readable tag.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Please upload a CSV file to start fraud detection.")]
    NoFile,

    #[error("Could not read uploaded CSV: {0}")]
    Parse(#[source] TableError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    #[error(transparent)]
    Inference(#[from] InferenceError),

    #[error("Could not export results: {0}")]
    Export(#[source] TableError),
}

impl PipelineError {
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::NoFile => "no_file",
            PipelineError::Reconcile(ReconcileError::MissingAmountColumn) => "missing_amount_column",
            PipelineError::Reconcile(ReconcileError::FeatureCountMismatch { .. }) => {
                "feature_count_mismatch"
            }
            PipelineError::Inference(InferenceError::FeatureNameMismatch { .. }) => {
                "feature_name_mismatch"
            }
            PipelineError::Inference(_) => "inference_error",
            PipelineError::Parse(_)
            | PipelineError::Reconcile(_)
            | PipelineError::Export(_) => "unspecified_upload_error",
        }
    }

    /// Last stage reached before failing
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::NoFile => Stage::NoFile,
            PipelineError::Parse(_) | PipelineError::Reconcile(_) => Stage::Uploaded,
            PipelineError::Inference(_) => Stage::Reconciled,
            PipelineError::Export(_) => Stage::Inferred,
        }
    }
}

/// Everything a successful request produces
#[derive(Debug, Clone)]
pub struct Outcome {
    pub notices: Vec<Notice>,
    pub result: Table,
    pub summary: Summary,
    pub csv: Vec<u8>,
}

/// Run one upload through reconciliation, inference and summary
pub fn run(upload: &[u8], model: &dyn Classifier) -> Result<Outcome, PipelineError> {
    if upload.is_empty() {
        return Err(PipelineError::NoFile);
    }

    let raw = Table::from_csv_bytes(upload).map_err(PipelineError::Parse)?;
    tracing::debug!(
        stage = ?Stage::Uploaded,
        rows = raw.num_rows(),
        columns = raw.num_columns(),
        "CSV parsed"
    );

    let reconciled = reconcile::reconcile(&raw, model.n_features_in())?;
    tracing::debug!(stage = ?Stage::Reconciled, columns = ?reconciled.table.column_names());

    let result = inference::infer(&reconciled.table, model)?;
    let csv = result.to_csv_bytes().map_err(PipelineError::Export)?;
    tracing::debug!(stage = ?Stage::Inferred, bytes = csv.len());

    let summary = summary::summarize(&result);
    tracing::debug!(stage = ?Stage::Summarized, ?summary);

    Ok(Outcome {
        notices: reconciled.notices,
        result,
        summary,
        csv,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::model::testing::StubClassifier;
    use crate::logic::model::ModelError;

    #[test]
    fn test_full_run() {
        let csv = "f1,Amount,Class\n0.9,100,1\n0.1,20,0\n0.6,35,0\n";
        let outcome = run(csv.as_bytes(), &StubClassifier::new(2)).unwrap();

        assert_eq!(outcome.summary.total_count, 3);
        assert_eq!(outcome.summary.fraud_count, 2);
        assert_eq!(outcome.summary.safe_count, 1);
        assert_eq!(outcome.notices.len(), 3);
        assert_eq!(
            outcome.result.column_names(),
            vec!["f1", "scaled_amount", "Fraud Prediction", "Fraud Probability"]
        );

        let text = String::from_utf8(outcome.csv).unwrap();
        let header = text.lines().next().unwrap();
        assert_eq!(header, "f1,scaled_amount,Fraud Prediction,Fraud Probability");
        assert_eq!(text.lines().count(), 4);
    }

    #[test]
    fn test_failures_carry_kind_and_stage() {
        let model = StubClassifier::new(3);

        let err = run(b"", &model).unwrap_err();
        assert_eq!((err.kind(), err.stage()), ("no_file", Stage::NoFile));

        let err = run(b"f1,f2\n1,2\n", &model).unwrap_err();
        assert_eq!(
            (err.kind(), err.stage()),
            ("missing_amount_column", Stage::Uploaded)
        );

        let err = run(b"scaled_amount,f1\n1,2\n", &model).unwrap_err();
        assert_eq!(err.kind(), "feature_count_mismatch");
        assert!(err.to_string().contains('3') && err.to_string().contains('2'));

        let err = run(b"a,b\n1\n", &model).unwrap_err();
        assert_eq!(err.kind(), "unspecified_upload_error");
    }

    #[test]
    fn test_model_failure_is_inference_error() {
        let model = StubClassifier::new(2).failing(ModelError::Runtime("bad input".into()));
        let err = run(b"f1,scaled_amount\n1,2\n", &model).unwrap_err();

        assert_eq!(err.kind(), "inference_error");
        assert_eq!(err.stage(), Stage::Reconciled);
        assert!(err.to_string().contains("bad input"));
    }

    #[test]
    fn test_padded_amount_header_is_not_amount() {
        let err = run(b" Amount ,f1\n1,2\n", &StubClassifier::new(2)).unwrap_err();
        assert_eq!(err.kind(), "missing_amount_column");
    }

    #[test]
    fn test_parse_error_message_is_not_repeated() {
        let err = run(b"Amount,f1\n1\n", &StubClassifier::new(2)).unwrap_err();
        let message = err.to_string();

        assert!(
            message.starts_with("Could not read uploaded CSV: CSV error: "),
            "{}",
            message
        );
        assert!(!message.contains("parse error"), "{}", message);
    }

    #[test]
    fn test_missing_cell_is_inference_error() {
        let err = run(b"f1,scaled_amount\n,2\n", &StubClassifier::new(2)).unwrap_err();
        assert_eq!(err.kind(), "inference_error");
    }
}
