//! Feature Reconciler
//!
//! Adjusts an uploaded table's columns so its width matches what the model
//! expects. Rules run in a fixed order because later rules look at the column
//! state left by earlier ones:
//!
//! 1. synthesize `scaled_amount` from `Amount` when it is missing
//! 2. drop reserved target/label columns
//! 3. drop `Amount` when `scaled_amount` is present
//! 4. compare the final width with the model's feature count

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::models::{Column, Table, TableError};

pub const AMOUNT: &str = "Amount";
pub const SCALED_AMOUNT: &str = "scaled_amount";

/// Label columns that must never reach the model.
/// Adding a name here is the only change needed to drop another one.
pub const TARGET_COLUMNS: &[&str] = &["Class", "Target", "Fraud", "label"];

// ============================================================================
// TYPES
// ============================================================================

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ReconcileError {
    #[error("CSV must have an 'Amount' column")]
    MissingAmountColumn,

    #[error(
        "Model expects {expected} features, but uploaded CSV has {actual} features after adjustments"
    )]
    FeatureCountMismatch { expected: usize, actual: usize },

    #[error("Column '{0}' must be numeric to be standardized")]
    NonNumericAmount(String),

    #[error("{0}")]
    InvalidTable(String),
}

/// Advisory adjustment made during reconciliation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    ScaledAmountGenerated,
    DroppedTargetColumn(String),
    DroppedAmount,
}

impl Notice {
    pub fn kind(&self) -> &'static str {
        match self {
            Notice::ScaledAmountGenerated => "scaled_amount_generated",
            Notice::DroppedTargetColumn(_) => "dropped_target_column",
            Notice::DroppedAmount => "dropped_amount",
        }
    }

    pub fn column(&self) -> &str {
        match self {
            Notice::ScaledAmountGenerated => SCALED_AMOUNT,
            Notice::DroppedTargetColumn(name) => name,
            Notice::DroppedAmount => AMOUNT,
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::ScaledAmountGenerated => {
                write!(f, "'{}' column generated automatically.", SCALED_AMOUNT)
            }
            Notice::DroppedTargetColumn(name) => write!(f, "Dropped target column: '{}'", name),
            Notice::DroppedAmount => write!(
                f,
                "Dropped '{}' column since model uses '{}'.",
                AMOUNT, SCALED_AMOUNT
            ),
        }
    }
}

impl Serialize for Notice {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("Notice", 3)?;
        state.serialize_field("kind", self.kind())?;
        state.serialize_field("column", self.column())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Working table plus the notices produced while building it
#[derive(Debug, Clone)]
pub struct Reconciled {
    pub table: Table,
    pub notices: Vec<Notice>,
}

// ============================================================================
// RECONCILIATION
// ============================================================================

/// Reconcile `raw` against the model's expected feature count.
/// The raw table is left untouched; the working table is a copy.
pub fn reconcile(raw: &Table, expected_feature_count: usize) -> Result<Reconciled, ReconcileError> {
    let mut table = raw.clone();
    let mut notices = Vec::new();

    if !table.contains(SCALED_AMOUNT) {
        let amount = table.column(AMOUNT).ok_or(ReconcileError::MissingAmountColumn)?;
        let values = amount
            .as_numeric()
            .ok_or_else(|| ReconcileError::NonNumericAmount(AMOUNT.to_string()))?;

        let scaled = Column::numeric(SCALED_AMOUNT, standardize(values));
        table
            .push_column(scaled)
            .map_err(|e: TableError| ReconcileError::InvalidTable(e.to_string()))?;
        notices.push(Notice::ScaledAmountGenerated);
    }

    for dropped in table.drop_columns_where(|c| TARGET_COLUMNS.contains(&c.name.as_str())) {
        notices.push(Notice::DroppedTargetColumn(dropped.name));
    }

    if table.contains(AMOUNT) && table.contains(SCALED_AMOUNT) {
        table.drop_column(AMOUNT);
        notices.push(Notice::DroppedAmount);
    }

    let actual = table.num_columns();
    if actual != expected_feature_count {
        return Err(ReconcileError::FeatureCountMismatch {
            expected: expected_feature_count,
            actual,
        });
    }

    for notice in &notices {
        tracing::info!(kind = notice.kind(), "{}", notice);
    }

    Ok(Reconciled { table, notices })
}

/// Zero mean, unit variance over the non-missing values of this batch.
/// Population variance; a constant column is only centred.
pub fn standardize(values: &[f64]) -> Vec<f64> {
    let present: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if present.is_empty() {
        return values.to_vec();
    }

    let n = present.len() as f64;
    let mean = present.iter().sum::<f64>() / n;
    let variance = present.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let scale = if variance > 0.0 { variance.sqrt() } else { 1.0 };

    values.iter().map(|v| (v - mean) / scale).collect()
}
