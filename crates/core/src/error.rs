// SPDX-License-Identifier: MIT

//! Fixed API error code catalog, shared by the HTTP surface and anything
//! that needs to report a client-facing failure with a stable code.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    JobNotFound,
    NotFound,
    WorkerBusy,
    Unauthorized,
    Forbidden,
    InternalError,
    InvalidParams,
    Conflict,
    RateLimited,
}

crate::simple_display! {
    ErrorCode {
        JobNotFound => "JOB_NOT_FOUND",
        NotFound => "NOT_FOUND",
        WorkerBusy => "WORKER_BUSY",
        Unauthorized => "UNAUTHORIZED",
        Forbidden => "FORBIDDEN",
        InternalError => "INTERNAL_ERROR",
        InvalidParams => "INVALID_PARAMS",
        Conflict => "CONFLICT",
        RateLimited => "RATE_LIMITED",
    }
}

impl ErrorCode {
    /// The HTTP status this code maps to.
    pub fn status_code(self) -> u16 {
        match self {
            ErrorCode::JobNotFound | ErrorCode::NotFound => 404,
            ErrorCode::Unauthorized => 401,
            ErrorCode::Forbidden => 403,
            ErrorCode::InvalidParams => 400,
            ErrorCode::Conflict | ErrorCode::WorkerBusy => 409,
            ErrorCode::RateLimited => 429,
            ErrorCode::InternalError => 500,
        }
    }
}

/// A client-facing error: a stable `code` plus a human-readable `message`.
#[derive(Debug, Clone, thiserror::Error, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }

    pub fn job_not_found(job_id: impl std::fmt::Display) -> Self {
        Self::new(ErrorCode::JobNotFound, format!("job {job_id} not found"))
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidParams, message)
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
