//! Prediction report model

use serde::Serialize;
use uuid::Uuid;

use crate::logic::pipeline::{Outcome, Stage};
use crate::logic::reconcile::Notice;
use crate::logic::summary::Summary;

pub const RESULT_FILENAME: &str = "fraud_predictions.csv";
pub const RESULT_MIME: &str = "text/csv";

#[derive(Debug, Serialize)]
pub struct Download {
    pub filename: &'static str,
    pub mime: &'static str,
    pub content: String,
}

/// Response for a completed prediction request
#[derive(Debug, Serialize)]
pub struct PredictionReport {
    pub request_id: Uuid,
    pub stage: Stage,
    pub message: &'static str,
    pub notices: Vec<Notice>,
    pub summary: Summary,
    pub columns: Vec<String>,
    pub preview: Vec<Vec<serde_json::Value>>,
    pub download: Download,
}

impl PredictionReport {
    pub fn render(request_id: Uuid, outcome: Outcome, preview_rows: usize) -> Self {
        let columns = outcome
            .result
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect();
        let preview = outcome.result.preview(preview_rows);

        Self {
            request_id,
            stage: Stage::Rendered,
            message: "Fraud detection completed successfully!",
            notices: outcome.notices,
            summary: outcome.summary,
            columns,
            preview,
            download: Download {
                filename: RESULT_FILENAME,
                mime: RESULT_MIME,
                content: String::from_utf8_lossy(&outcome.csv).into_owned(),
            },
        }
    }
}
