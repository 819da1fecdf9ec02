//! Model description handler

use axum::{extract::State, Json};

use crate::logic::model::ModelInfo;
use crate::AppState;

/// Describe the loaded classifier
pub async fn describe(State(state): State<AppState>) -> Json<ModelInfo> {
    Json(state.model.info())
}
