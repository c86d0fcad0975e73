// SPDX-License-Identifier: MIT

//! Maps the core's errors onto the `{code, message}` catalog spec.md §7
//! names. The catalog also reserves `WORKER_BUSY`, `UNAUTHORIZED`,
//! `FORBIDDEN` and `RATE_LIMITED` for the auth/throttling middleware that
//! spec.md §1 places out of scope for this thin router.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use mf_orchestrator::OrchestratorError;
use mf_store::StoreError;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Orchestrator(#[from] OrchestratorError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("{0}")]
    InvalidParams(String),
}

#[derive(Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

impl ApiError {
    fn code_and_status(&self) -> (&'static str, StatusCode) {
        match self {
            ApiError::Orchestrator(OrchestratorError::JobNotFound(_)) => ("JOB_NOT_FOUND", StatusCode::NOT_FOUND),
            ApiError::Orchestrator(OrchestratorError::NoProfile(_)) => ("INVALID_PARAMS", StatusCode::BAD_REQUEST),
            ApiError::Orchestrator(OrchestratorError::InvalidParams(_)) => ("INVALID_PARAMS", StatusCode::BAD_REQUEST),
            ApiError::Orchestrator(OrchestratorError::Store(e)) => store_code_and_status(e),
            ApiError::Orchestrator(OrchestratorError::Bus(_)) => ("INTERNAL_ERROR", StatusCode::INTERNAL_SERVER_ERROR),
            ApiError::Store(e) => store_code_and_status(e),
            ApiError::InvalidParams(_) => ("INVALID_PARAMS", StatusCode::BAD_REQUEST),
        }
    }
}

fn store_code_and_status(e: &StoreError) -> (&'static str, StatusCode) {
    match e {
        StoreError::NotFound => ("NOT_FOUND", StatusCode::NOT_FOUND),
        StoreError::Conflict(_) => ("CONFLICT", StatusCode::CONFLICT),
        StoreError::Backend(_) => ("INTERNAL_ERROR", StatusCode::INTERNAL_SERVER_ERROR),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (code, status) = self.code_and_status();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, code, "request failed");
        }
        (status, Json(ErrorBody { code, message: self.to_string() })).into_response()
    }
}
