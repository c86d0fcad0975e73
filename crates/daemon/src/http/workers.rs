// SPDX-License-Identifier: MIT

use axum::extract::State;
use axum::Json;
use mf_core::model::Worker;

use crate::error::ApiError;
use crate::state::AppState;

/// **Worker listing** (spec.md §6): "a pure read of the Store."
pub async fn list_workers(State(state): State<AppState>) -> Result<Json<Vec<Worker>>, ApiError> {
    Ok(Json(state.store.list_workers().await?))
}
