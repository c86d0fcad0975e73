// SPDX-License-Identifier: MIT

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use mf_core::model::{Job, JobId, JobLog, JobStatus, SourceType, Task};
use mf_store::JobFilter;
use mf_store::Page;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Deserialize)]
pub struct SubmitJobBody {
    pub user_id: Uuid,
    pub source_url: String,
    pub source_type: SourceType,
    #[serde(default)]
    pub profiles: Vec<String>,
}

pub async fn submit_job(State(state): State<AppState>, Json(body): Json<SubmitJobBody>) -> Result<(StatusCode, Json<Job>), ApiError> {
    if body.source_url.trim().is_empty() {
        return Err(ApiError::InvalidParams("source_url must not be empty".into()));
    }
    let job = state
        .orchestrator
        .submit_job(mf_orchestrator::SubmitJobRequest {
            user_id: body.user_id,
            source_url: body.source_url,
            source_type: body.source_type,
            profiles: body.profiles,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(job)))
}

pub async fn get_job(State(state): State<AppState>, Path(id): Path<JobId>) -> Result<Json<Job>, ApiError> {
    Ok(Json(state.orchestrator.get_job(id).await?))
}

#[derive(Debug, Deserialize)]
pub struct ListJobsQuery {
    pub user_id: Option<Uuid>,
    pub status: Option<JobStatus>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

pub async fn list_jobs(State(state): State<AppState>, Query(query): Query<ListJobsQuery>) -> Result<Json<Vec<Job>>, ApiError> {
    let limit = query.limit.unwrap_or(50);
    if limit == 0 || limit > MAX_PAGE_SIZE {
        return Err(ApiError::InvalidParams(format!("limit must be in 1..={MAX_PAGE_SIZE}")));
    }
    let offset = query.offset.unwrap_or(0);

    let filter = JobFilter { user_id: query.user_id, status: query.status };
    let page = Page { offset, limit };
    Ok(Json(state.orchestrator.list_jobs(filter, page).await?))
}

pub async fn cancel_job(State(state): State<AppState>, Path(id): Path<JobId>) -> Result<Json<Job>, ApiError> {
    Ok(Json(state.orchestrator.cancel_job(id).await?))
}

/// Not exposed on [`mf_orchestrator::Orchestrator`] — deletion is a pure
/// store operation with no orchestration (task/event) side effects.
pub async fn delete_job(State(state): State<AppState>, Path(id): Path<JobId>) -> Result<StatusCode, ApiError> {
    state.store.delete_job(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn restart_job(State(state): State<AppState>, Path(id): Path<JobId>) -> Result<(StatusCode, Json<Job>), ApiError> {
    Ok((StatusCode::CREATED, Json(state.orchestrator.restart_job(id).await?)))
}

pub async fn get_job_tasks(State(state): State<AppState>, Path(id): Path<JobId>) -> Result<Json<Vec<Task>>, ApiError> {
    Ok(Json(state.orchestrator.get_job_tasks(id).await?))
}

pub async fn get_job_logs(State(state): State<AppState>, Path(id): Path<JobId>) -> Result<Json<Vec<JobLog>>, ApiError> {
    Ok(Json(state.orchestrator.get_job_logs(id).await?))
}

#[derive(Debug, Deserialize)]
pub struct SubmitRestreamBody {
    pub user_id: Uuid,
    pub source_url: String,
}

pub async fn submit_restream(State(state): State<AppState>, Json(body): Json<SubmitRestreamBody>) -> Result<(StatusCode, Json<Job>), ApiError> {
    if body.source_url.trim().is_empty() {
        return Err(ApiError::InvalidParams("source_url must not be empty".into()));
    }
    let job = state.orchestrator.submit_restream(body.user_id, body.source_url).await?;
    Ok((StatusCode::CREATED, Json(job)))
}

pub async fn stop_restream(State(state): State<AppState>, Path(id): Path<JobId>) -> Result<Json<Job>, ApiError> {
    Ok(Json(state.orchestrator.stop_restream(id).await?))
}
