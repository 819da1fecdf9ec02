//! Result Summarizer

use serde::Serialize;

use crate::logic::inference::PREDICTION_COLUMN;
use crate::models::Table;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub fraud_count: usize,
    pub safe_count: usize,
    pub total_count: usize,
}

/// Count fraud (nonzero prediction) and safe rows
pub fn summarize(result: &Table) -> Summary {
    let total_count = result.num_rows();
    let fraud_count = result
        .column(PREDICTION_COLUMN)
        .and_then(|c| c.as_numeric())
        .map(|labels| labels.iter().filter(|&&v| v != 0.0 && !v.is_nan()).count())
        .unwrap_or(0);

    Summary {
        fraud_count,
        safe_count: total_count - fraud_count,
        total_count,
    }
}
