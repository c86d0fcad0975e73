// SPDX-License-Identifier: MIT

//! The thin HTTP front-end spec.md §6 calls "the core's contract" to a
//! wrapper: one route per operation it names, no auth/validation
//! middleware beyond what each handler does itself. Grounded on the
//! `Router::new().route(...).with_state(state)` shape found in the
//! retrieval pack's axum orchestrator example, since the teacher's own
//! daemon crate is an IPC-socket server, not an HTTP one.

mod jobs;
mod workers;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(health))
        .route("/jobs", post(jobs::submit_job).get(jobs::list_jobs))
        .route("/jobs/:id", get(jobs::get_job).delete(jobs::delete_job))
        .route("/jobs/:id/cancel", post(jobs::cancel_job))
        .route("/jobs/:id/restart", post(jobs::restart_job))
        .route("/jobs/:id/tasks", get(jobs::get_job_tasks))
        .route("/jobs/:id/logs", get(jobs::get_job_logs))
        .route("/restreams", post(jobs::submit_restream))
        .route("/restreams/:id/stop", post(jobs::stop_restream))
        .route("/workers", get(workers::list_workers))
        .route("/events", get(crate::sse::handler))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
