// SPDX-License-Identifier: MIT

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! The core state machine: the orchestrator turns task-completion events
//! arriving over the bus into job state transitions and the next wave of
//! dispatched tasks. One instance runs in the control plane; persistence is
//! the source of truth so the orchestrator can restart at any point without
//! losing track of which jobs are mid-flight.

mod error;
pub mod segmentation;

pub use error::OrchestratorError;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex as SyncMutex;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{info, warn};
use uuid::Uuid;

use mf_bus::{subjects, Bus, BusExt};
use mf_core::model::{
    AuditLogEntry, Job, JobId, JobLog, JobStatus, LogLevel, Profile, ProbeResult, SourceType,
    StitchParams, Task, TaskStatus, TaskType, TranscodeParams, NO_SEQUENCE,
};
use mf_core::wire::{TaskEnvelope, TaskEventKind, TaskEventMessage};
use mf_store::{JobFilter, Page, Store};

/// Request shape for [`Orchestrator::submit_job`].
#[derive(Debug, Clone)]
pub struct SubmitJobRequest {
    pub user_id: Uuid,
    pub source_url: String,
    pub source_type: SourceType,
    pub profiles: Vec<String>,
}

/// The orchestrator's dependencies are a bus and a store, each referenced
/// through their object-safe trait so the daemon can wire up `NatsBus` or
/// `InMemoryBus`, `PostgresStore` or `InMemoryStore`, without this crate
/// knowing which.
pub struct Orchestrator {
    bus: Arc<dyn Bus>,
    store: Arc<dyn Store>,
    /// Per-job quiescence gate (§4.3): serializes the decision to create a
    /// job's stitch task so concurrent delivery of the last two
    /// transcode-completed events can't create it twice. Counting happens
    /// under the gate against the store, not against in-memory state, so a
    /// restarted orchestrator re-derives the same answer.
    stitch_gates: SyncMutex<HashMap<JobId, Arc<AsyncMutex<()>>>>,
}

impl Orchestrator {
    pub fn new(bus: Arc<dyn Bus>, store: Arc<dyn Store>) -> Self {
        Self { bus, store, stitch_gates: SyncMutex::new(HashMap::new()) }
    }

    fn stitch_gate(&self, job_id: JobId) -> Arc<AsyncMutex<()>> {
        self.stitch_gates.lock().entry(job_id).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
    }

    async fn audit(&self, actor: &str, action: &str, resource: String, metadata: serde_json::Value) {
        let entry = AuditLogEntry::new(actor.to_string(), action.to_string(), resource, metadata, Utc::now());
        if let Err(err) = self.store.append_audit(entry).await {
            warn!(%err, action, "failed to append audit entry");
        }
    }

    async fn dispatch_task(&self, task: &Task) -> Result<(), OrchestratorError> {
        let envelope = TaskEnvelope {
            task_id: task.id,
            job_id: task.job_id,
            kind: task.kind.to_string(),
            params: task.params.clone(),
            sequence_index: task.sequence_index,
        };
        self.bus.dispatch_work_json(subjects::JOBS_DISPATCH, &envelope).await?;
        Ok(())
    }

    async fn publish_job_event(&self, task: &Task, event: TaskEventKind, progress_pct: Option<u8>, message: Option<String>, result: Option<serde_json::Value>) {
        let message = TaskEventMessage { task_id: task.id, job_id: task.job_id, event, progress_pct, message, result };
        if let Err(err) = self.bus.publish_json(subjects::JOBS_EVENTS, &message).await {
            warn!(%err, task_id = %task.id, "failed to republish job event; SSE subscribers may miss this update");
        }
    }

    /// **SubmitJob** (spec §4.3): insert the Job and its probe task, dispatch
    /// the probe, and record the audit trail. A failure after the Job insert
    /// leaves it `queued` forever; the caller must surface that.
    pub async fn submit_job(&self, request: SubmitJobRequest) -> Result<Job, OrchestratorError> {
        let now = Utc::now();
        let job = Job::new(request.user_id, request.source_url.clone(), request.source_type, request.profiles, now);
        let job = self.store.create_job(job).await?;

        let probe_params = serde_json::json!({ "url": job.source_url });
        let probe = Task::new(job.id, TaskType::Probe, 0, probe_params, now);
        let probe = self.store.create_tasks(vec![probe]).await?.remove(0);

        self.dispatch_task(&probe).await?;
        self.audit("orchestrator", "job.create", job.id.to_string(), serde_json::json!({ "source_url": job.source_url })).await;

        Ok(job)
    }

    /// **RestartJob** (spec §4.3): resubmit with the original job's source
    /// and profiles, auditing a reference back to the id being restarted.
    pub async fn restart_job(&self, id: JobId) -> Result<Job, OrchestratorError> {
        let original = self.store.get_job(id).await.map_err(|_| OrchestratorError::JobNotFound(id))?;
        let restarted = self
            .submit_job(SubmitJobRequest {
                user_id: original.user_id,
                source_url: original.source_url.clone(),
                source_type: original.source_type,
                profiles: original.profiles.clone(),
            })
            .await?;
        self.audit("orchestrator", "job.restart", restarted.id.to_string(), serde_json::json!({ "restarted_from": id.to_string() })).await;
        Ok(restarted)
    }

    /// **CancelJob** (spec §4.3): marks the job cancelled if not already
    /// terminal. In-flight tasks are not interrupted; their eventual results
    /// are discarded by [`Self::handle_task_event`] once it observes the
    /// terminal status.
    pub async fn cancel_job(&self, id: JobId) -> Result<Job, OrchestratorError> {
        let mut job = self.store.get_job(id).await.map_err(|_| OrchestratorError::JobNotFound(id))?;
        if job.is_terminal() {
            return Ok(job);
        }
        job.finish(JobStatus::Cancelled, Utc::now(), None);
        let job = self.store.update_job(job).await?;
        self.bus
            .publish_json(
                subjects::JOBS_EVENTS,
                &serde_json::json!({ "job_id": job.id, "event": "cancelled" }),
            )
            .await
            .ok();
        self.audit("orchestrator", "job.cancel", job.id.to_string(), serde_json::Value::Null).await;
        Ok(job)
    }

    /// **SubmitRestream**: a single `restream` task dispatched the same way
    /// as a probe, with no segmentation or stitching to follow.
    pub async fn submit_restream(&self, user_id: Uuid, source_url: String) -> Result<Job, OrchestratorError> {
        let now = Utc::now();
        let job = Job::new(user_id, source_url.clone(), SourceType::Restream, Vec::new(), now);
        let job = self.store.create_job(job).await?;
        let task = Task::new(job.id, TaskType::Restream, NO_SEQUENCE, serde_json::json!({ "url": source_url }), now);
        let task = self.store.create_tasks(vec![task]).await?.remove(0);
        self.dispatch_task(&task).await?;
        self.audit("orchestrator", "restream.start", job.id.to_string(), serde_json::Value::Null).await;
        Ok(job)
    }

    /// **StopRestream**: cancelling a restream job is the same state
    /// transition as cancelling any other job; the worker side observes the
    /// terminal status and tears down its stream.
    pub async fn stop_restream(&self, id: JobId) -> Result<Job, OrchestratorError> {
        self.cancel_job(id).await
    }

    /// **HandleTaskEvent** (spec §4.3): dispatch on the reported event kind.
    pub async fn handle_task_event(&self, message: TaskEventMessage) -> Result<(), OrchestratorError> {
        match message.event {
            TaskEventKind::Progress => self.handle_progress(message).await,
            TaskEventKind::Log => self.handle_log(message).await,
            TaskEventKind::Failed => self.handle_failed(message).await,
            TaskEventKind::Completed => self.handle_completed(message).await,
        }
    }

    async fn handle_progress(&self, message: TaskEventMessage) -> Result<(), OrchestratorError> {
        let Some(pct) = message.progress_pct else { return Ok(()) };
        let mut task = match self.store.get_task(message.task_id).await {
            Ok(task) => task,
            Err(_) => return Ok(()),
        };
        task.set_progress(pct, Utc::now());
        self.store.update_task(task.clone()).await?;

        let mut job = match self.store.get_job(message.job_id).await {
            Ok(job) => job,
            Err(_) => return Ok(()),
        };
        if job.is_terminal() {
            return Ok(());
        }
        job.set_progress(pct as i64, Utc::now());
        self.store.update_job(job).await?;
        self.publish_job_event(&task, TaskEventKind::Progress, Some(pct), None, None).await;
        Ok(())
    }

    /// **log** (spec §4.3): append a `JobLog` line; no job/task state changes.
    async fn handle_log(&self, message: TaskEventMessage) -> Result<(), OrchestratorError> {
        let Some(text) = message.message else { return Ok(()) };
        let entry = JobLog::new(message.job_id, LogLevel::Info, text, Utc::now());
        self.store.append_job_log(entry).await?;
        Ok(())
    }

    async fn handle_failed(&self, message: TaskEventMessage) -> Result<(), OrchestratorError> {
        let mut task = match self.store.get_task(message.task_id).await {
            Ok(task) => task,
            Err(_) => return Ok(()),
        };
        if task.status.is_terminal() {
            warn!(task_id = %task.id, "ignoring failed event for a task already in a terminal state");
            return Ok(());
        }
        task.fail(Utc::now());
        let task = self.store.update_task(task).await?;

        let mut job = match self.store.get_job(task.job_id).await {
            Ok(job) => job,
            Err(_) => return Ok(()),
        };
        if job.is_terminal() {
            return Ok(());
        }
        let error_message = format!("task {} ({}) failed", task.id, task.kind);
        job.finish(JobStatus::Failed, Utc::now(), Some(error_message.clone()));
        self.store.update_job(job).await?;

        self.publish_job_event(&task, TaskEventKind::Failed, None, Some(error_message), message.result).await;
        self.audit("orchestrator", "job.fail", task.job_id.to_string(), serde_json::json!({ "task_id": task.id.to_string() })).await;
        Ok(())
    }

    async fn handle_completed(&self, message: TaskEventMessage) -> Result<(), OrchestratorError> {
        let mut task = match self.store.get_task(message.task_id).await {
            Ok(task) => task,
            Err(_) => return Ok(()),
        };
        // Property 1 / property 4: the first terminal event wins. A second
        // `completed`, or a `completed` arriving after a `failed`, is a no-op.
        if task.status.is_terminal() {
            if task.status == TaskStatus::Completed {
                info!(task_id = %task.id, "duplicate completed event ignored");
            } else {
                warn!(task_id = %task.id, prior = %task.status, "completed event conflicts with prior terminal status");
            }
            return Ok(());
        }

        let output_key = message.result.as_ref().and_then(|r| r.get("output_path")).and_then(|v| v.as_str()).map(str::to_string);
        task.complete(message.result.clone().unwrap_or(serde_json::Value::Null), output_key, Utc::now());
        let task = self.store.update_task(task).await?;

        self.publish_job_event(&task, TaskEventKind::Completed, Some(100), None, message.result.clone()).await;

        let job = match self.store.get_job(task.job_id).await {
            Ok(job) => job,
            Err(_) => return Ok(()),
        };
        if job.is_terminal() {
            return Ok(());
        }

        match task.kind {
            TaskType::Probe => self.on_probe_completed(job, message.result).await,
            TaskType::Transcode => self.on_transcode_completed(job).await,
            TaskType::Stitch => self.on_stitch_completed(job, task).await,
            TaskType::Restream | TaskType::Manifest => Ok(()),
        }
    }

    /// *probe completed* (spec §4.3): plan segments from the probe result,
    /// fan out transcode tasks, move the job to `processing`.
    async fn on_probe_completed(&self, mut job: Job, result: Option<serde_json::Value>) -> Result<(), OrchestratorError> {
        let Some(result) = result else {
            return Err(OrchestratorError::InvalidParams("probe completed with no result".into()));
        };
        let probe: ProbeResult = serde_json::from_value(result)
            .map_err(|e| OrchestratorError::InvalidParams(format!("malformed probe result: {e}")))?;

        let healthy_workers = self.store.list_workers().await?.iter().filter(|w| w.is_healthy(Utc::now(), chrono::Duration::seconds(30))).count();
        let segments = segmentation::plan_segments(probe.duration_sec, &probe.keyframe_offsets_sec, healthy_workers);

        let profile = job
            .primary_profile()
            .and_then(Profile::lookup)
            .unwrap_or_else(Profile::default_builtin);

        let now = Utc::now();
        let tasks: Vec<Task> = segments
            .iter()
            .map(|segment| {
                let params = TranscodeParams {
                    input_url: job.source_url.clone(),
                    output_url: format!("{}/segments/{}", job.source_url, segment.index),
                    start_time: segment.start_time_sec,
                    duration: segment.duration_sec(),
                    video_codec: profile.video_codec.to_string(),
                    audio_codec: profile.audio_codec.to_string(),
                    width: profile.width,
                    height: profile.height,
                    bitrate_kbps: profile.bitrate_kbps,
                    preset: profile.preset.to_string(),
                    container: profile.container.to_string(),
                };
                #[allow(clippy::expect_used)]
                let params = serde_json::to_value(params).expect("TranscodeParams is plain data and always serializes");
                Task::new(job.id, TaskType::Transcode, segment.index as i32, params, now)
            })
            .collect();

        let tasks = self.store.create_tasks(tasks).await?;
        for task in &tasks {
            self.dispatch_task(task).await?;
        }

        job.advance(JobStatus::Processing, now);
        self.store.update_job(job).await?;
        Ok(())
    }

    /// *transcode completed* (spec §4.3): the quiescence gate. Counts
    /// remaining `{pending, assigned}` tasks against the store, serialized
    /// per job, so concurrent delivery of the last two events can't both
    /// observe zero and each create a stitch task.
    async fn on_transcode_completed(&self, mut job: Job) -> Result<(), OrchestratorError> {
        let gate = self.stitch_gate(job.id);
        let _permit = gate.lock().await;

        let tasks = self.store.list_tasks_for_job(job.id).await?;
        let remaining = tasks.iter().filter(|t| matches!(t.status, TaskStatus::Pending | TaskStatus::Assigned)).count();
        if remaining > 0 {
            return Ok(());
        }
        if tasks.iter().any(|t| t.kind == TaskType::Stitch) {
            return Ok(());
        }

        let mut segment_outputs: Vec<Task> = tasks.into_iter().filter(|t| t.kind == TaskType::Transcode && t.status == TaskStatus::Completed).collect();
        segment_outputs.sort_by_key(|t| t.sequence_index);
        let segment_output_keys: Vec<String> = segment_outputs.into_iter().filter_map(|t| t.output_key).collect();

        let params = StitchParams { output_url: format!("{}/final", job.source_url), segment_output_keys };
        let now = Utc::now();
        #[allow(clippy::expect_used)]
        let params = serde_json::to_value(params).expect("StitchParams is plain data and always serializes");
        let stitch = Task::new(job.id, TaskType::Stitch, NO_SEQUENCE, params, now);
        let stitch = self.store.create_tasks(vec![stitch]).await?.remove(0);
        self.dispatch_task(&stitch).await?;

        job.advance(JobStatus::Stitching, now);
        self.store.update_job(job).await?;
        Ok(())
    }

    /// *stitch completed* (spec §4.3): the job is done.
    async fn on_stitch_completed(&self, mut job: Job, _stitch_task: Task) -> Result<(), OrchestratorError> {
        job.finish(JobStatus::Completed, Utc::now(), None);
        self.store.update_job(job).await?;
        Ok(())
    }

    /// **ListJobs**: a pure read of the store, exposed here so the HTTP
    /// surface only needs one dependency.
    pub async fn list_jobs(&self, filter: JobFilter, page: Page) -> Result<Vec<Job>, OrchestratorError> {
        Ok(self.store.list_jobs(filter, page).await?)
    }

    pub async fn get_job(&self, id: JobId) -> Result<Job, OrchestratorError> {
        self.store.get_job(id).await.map_err(|_| OrchestratorError::JobNotFound(id))
    }

    pub async fn get_job_tasks(&self, id: JobId) -> Result<Vec<Task>, OrchestratorError> {
        Ok(self.store.list_tasks_for_job(id).await?)
    }

    pub async fn get_job_logs(&self, id: JobId) -> Result<Vec<JobLog>, OrchestratorError> {
        Ok(self.store.list_job_logs_for_job(id).await?)
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
