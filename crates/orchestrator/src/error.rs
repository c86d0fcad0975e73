// SPDX-License-Identifier: MIT

use mf_bus::BusError;
use mf_core::model::JobId;
use mf_store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("job {0} not found")]
    JobNotFound(JobId),
    #[error("job {0} has no profiles and no default profile is configured")]
    NoProfile(JobId),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("bus error: {0}")]
    Bus(#[from] BusError),
    #[error("invalid params: {0}")]
    InvalidParams(String),
}
