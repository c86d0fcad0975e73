use std::sync::Arc;

use mf_bus::{Bus, BusExt, InMemoryBus};
use mf_core::model::{JobStatus, ProbeResult, TaskStatus, TaskType, Worker, WorkerId};
use mf_core::wire::{subjects, TaskEventKind, TaskEventMessage};
use mf_store::{InMemoryStore, JobStore, TaskStore, WorkerStore};

use super::*;

fn harness() -> (Orchestrator, Arc<InMemoryBus>, Arc<InMemoryStore>) {
    let bus = Arc::new(InMemoryBus::new());
    let store = Arc::new(InMemoryStore::new());
    let orchestrator = Orchestrator::new(bus.clone(), store.clone());
    (orchestrator, bus, store)
}

async fn register_healthy_workers(store: &InMemoryStore, count: usize) {
    for i in 0..count {
        let worker = Worker::register(WorkerId::new(format!("worker-{i}")), "host".into(), "1.0".into(), vec!["probe".into(), "transcode".into()], serde_json::json!({}), Utc::now());
        store.upsert_worker(worker).await.unwrap();
    }
}

fn completed_event(task_id: mf_core::model::TaskId, job_id: JobId, result: serde_json::Value) -> TaskEventMessage {
    TaskEventMessage { task_id, job_id, event: TaskEventKind::Completed, progress_pct: Some(100), message: None, result: Some(result) }
}

fn failed_event(task_id: mf_core::model::TaskId, job_id: JobId, message: &str) -> TaskEventMessage {
    TaskEventMessage { task_id, job_id, event: TaskEventKind::Failed, progress_pct: None, message: Some(message.to_string()), result: None }
}

#[tokio::test]
async fn s1_single_worker_happy_path() {
    let (orchestrator, _bus, store) = harness();
    register_healthy_workers(&store, 1).await;

    let job = orchestrator
        .submit_job(SubmitJobRequest { user_id: Uuid::new_v4(), source_url: "s3://in/video.mp4".into(), source_type: SourceType::Url, profiles: vec!["h264_1080p".into()] })
        .await
        .unwrap();

    let probe_task = store.list_tasks_for_job(job.id).await.unwrap().remove(0);
    let probe_result = ProbeResult { duration_sec: 42.0, video_codec: "h264".into(), audio_codec: "aac".into(), width: 1920, height: 1080, keyframe_offsets_sec: vec![0.0, 15.0, 30.0] };
    orchestrator.handle_task_event(completed_event(probe_task.id, job.id, serde_json::to_value(&probe_result).unwrap())).await.unwrap();

    let tasks = store.list_tasks_for_job(job.id).await.unwrap();
    let transcodes: Vec<_> = tasks.iter().filter(|t| t.kind == TaskType::Transcode).collect();
    assert_eq!(transcodes.len(), 1);
    let params: mf_core::model::TranscodeParams = serde_json::from_value(transcodes[0].params.clone()).unwrap();
    assert_eq!(params.start_time, 0.0);
    assert_eq!(params.duration, 42.0);

    let job = store.get_job(job.id).await.unwrap();
    assert_eq!(job.status, JobStatus::Processing);

    let transcode_id = transcodes[0].id;
    let transcode_result = serde_json::json!({ "output_path": "s3://out/seg-0.mp4", "duration_sec": 42.0, "size_bytes": 1000 });
    orchestrator.handle_task_event(completed_event(transcode_id, job.id, transcode_result)).await.unwrap();

    let tasks = store.list_tasks_for_job(job.id).await.unwrap();
    let stitch_tasks: Vec<_> = tasks.iter().filter(|t| t.kind == TaskType::Stitch).collect();
    assert_eq!(stitch_tasks.len(), 1);
    let stitch_id = stitch_tasks[0].id;

    let job = store.get_job(job.id).await.unwrap();
    assert_eq!(job.status, JobStatus::Stitching);

    let stitch_result = serde_json::json!({ "output_path": "s3://out/final.mp4", "duration_sec": 42.0, "size_bytes": 5000 });
    orchestrator.handle_task_event(completed_event(stitch_id, job.id, stitch_result)).await.unwrap();

    let job = store.get_job(job.id).await.unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.progress_pct, 100);
}

#[tokio::test]
async fn s2_multi_worker_fan_out_produces_contiguous_keyframe_aligned_segments() {
    let (orchestrator, _bus, store) = harness();
    register_healthy_workers(&store, 4).await;

    let job = orchestrator
        .submit_job(SubmitJobRequest { user_id: Uuid::new_v4(), source_url: "s3://in/video.mp4".into(), source_type: SourceType::Url, profiles: vec!["h264_1080p".into()] })
        .await
        .unwrap();
    let probe_task = store.list_tasks_for_job(job.id).await.unwrap().remove(0);
    let probe_result = ProbeResult {
        duration_sec: 90.0,
        video_codec: "h264".into(),
        audio_codec: "aac".into(),
        width: 1920,
        height: 1080,
        keyframe_offsets_sec: vec![0.0, 10.0, 22.0, 31.0, 44.0, 58.0, 71.0, 85.0, 90.0],
    };
    orchestrator.handle_task_event(completed_event(probe_task.id, job.id, serde_json::to_value(&probe_result).unwrap())).await.unwrap();

    let tasks = store.list_tasks_for_job(job.id).await.unwrap();
    let mut transcodes: Vec<_> = tasks.iter().filter(|t| t.kind == TaskType::Transcode).collect();
    transcodes.sort_by_key(|t| t.sequence_index);

    let mut expected_start = 0.0;
    for task in &transcodes {
        let params: mf_core::model::TranscodeParams = serde_json::from_value(task.params.clone()).unwrap();
        assert_eq!(params.start_time, expected_start);
        expected_start = params.start_time + params.duration;
        assert!(probe_result.keyframe_offsets_sec.contains(&params.start_time));
    }
    assert_eq!(expected_start, 90.0);
}

#[tokio::test]
async fn s3_task_failure_terminates_job_without_stitch() {
    let (orchestrator, _bus, store) = harness();
    register_healthy_workers(&store, 4).await;

    let job = orchestrator
        .submit_job(SubmitJobRequest { user_id: Uuid::new_v4(), source_url: "s3://in/video.mp4".into(), source_type: SourceType::Url, profiles: vec![] })
        .await
        .unwrap();
    let probe_task = store.list_tasks_for_job(job.id).await.unwrap().remove(0);
    let probe_result = ProbeResult { duration_sec: 90.0, video_codec: "h264".into(), audio_codec: "aac".into(), width: 1920, height: 1080, keyframe_offsets_sec: vec![0.0, 10.0, 22.0, 31.0, 44.0, 58.0, 71.0, 85.0, 90.0] };
    orchestrator.handle_task_event(completed_event(probe_task.id, job.id, serde_json::to_value(&probe_result).unwrap())).await.unwrap();

    let tasks = store.list_tasks_for_job(job.id).await.unwrap();
    let mut transcodes: Vec<_> = tasks.iter().filter(|t| t.kind == TaskType::Transcode).collect();
    transcodes.sort_by_key(|t| t.sequence_index);
    assert!(transcodes.len() >= 2, "need at least two segments to pick a middle one to fail");
    let failing_task_id = transcodes[transcodes.len() / 2].id;

    orchestrator.handle_task_event(failed_event(failing_task_id, job.id, "ffmpeg exited with status 1")).await.unwrap();

    let job = store.get_job(job.id).await.unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.error_message.as_ref().unwrap().contains(&failing_task_id.to_string()));

    // The remaining segments completing afterward must not spawn a stitch task.
    for task in &transcodes {
        if task.id == failing_task_id {
            continue;
        }
        let result = serde_json::json!({ "output_path": format!("s3://out/{}.mp4", task.id), "duration_sec": 1.0, "size_bytes": 1 });
        orchestrator.handle_task_event(completed_event(task.id, job.id, result)).await.unwrap();
    }
    let tasks = store.list_tasks_for_job(job.id).await.unwrap();
    assert!(tasks.iter().all(|t| t.kind != TaskType::Stitch));
}

#[tokio::test]
async fn s4_duplicate_completed_event_creates_one_stitch_task() {
    let (orchestrator, _bus, store) = harness();
    register_healthy_workers(&store, 1).await;

    let job = orchestrator
        .submit_job(SubmitJobRequest { user_id: Uuid::new_v4(), source_url: "s3://in/video.mp4".into(), source_type: SourceType::Url, profiles: vec![] })
        .await
        .unwrap();
    let probe_task = store.list_tasks_for_job(job.id).await.unwrap().remove(0);
    let probe_result = ProbeResult { duration_sec: 42.0, video_codec: "h264".into(), audio_codec: "aac".into(), width: 1920, height: 1080, keyframe_offsets_sec: vec![0.0, 42.0] };
    orchestrator.handle_task_event(completed_event(probe_task.id, job.id, serde_json::to_value(&probe_result).unwrap())).await.unwrap();

    let tasks = store.list_tasks_for_job(job.id).await.unwrap();
    let transcode = tasks.iter().find(|t| t.kind == TaskType::Transcode).unwrap();
    let result = serde_json::json!({ "output_path": "s3://out/seg-0.mp4", "duration_sec": 42.0, "size_bytes": 100 });

    orchestrator.handle_task_event(completed_event(transcode.id, job.id, result.clone())).await.unwrap();
    orchestrator.handle_task_event(completed_event(transcode.id, job.id, result)).await.unwrap();

    let tasks = store.list_tasks_for_job(job.id).await.unwrap();
    assert_eq!(tasks.iter().filter(|t| t.kind == TaskType::Stitch).count(), 1);
}

#[tokio::test]
async fn property_1_terminal_job_is_never_mutated_again() {
    let (orchestrator, _bus, store) = harness();
    let job = orchestrator
        .submit_job(SubmitJobRequest { user_id: Uuid::new_v4(), source_url: "s3://in/video.mp4".into(), source_type: SourceType::Url, profiles: vec![] })
        .await
        .unwrap();
    let cancelled = orchestrator.cancel_job(job.id).await.unwrap();
    assert_eq!(cancelled.status, JobStatus::Cancelled);

    let probe_task = store.list_tasks_for_job(job.id).await.unwrap().remove(0);
    let probe_result = ProbeResult { duration_sec: 10.0, video_codec: "h264".into(), audio_codec: "aac".into(), width: 640, height: 480, keyframe_offsets_sec: vec![0.0, 10.0] };
    orchestrator.handle_task_event(completed_event(probe_task.id, job.id, serde_json::to_value(&probe_result).unwrap())).await.unwrap();

    let job = store.get_job(job.id).await.unwrap();
    assert_eq!(job.status, JobStatus::Cancelled);
    assert_eq!(job.progress_pct, cancelled.progress_pct);
}

#[tokio::test]
async fn property_3_concurrent_final_transcode_events_create_a_single_stitch_task() {
    let (orchestrator, _bus, store) = harness();
    register_healthy_workers(&store, 4).await;

    let job = orchestrator
        .submit_job(SubmitJobRequest { user_id: Uuid::new_v4(), source_url: "s3://in/video.mp4".into(), source_type: SourceType::Url, profiles: vec![] })
        .await
        .unwrap();
    let probe_task = store.list_tasks_for_job(job.id).await.unwrap().remove(0);
    let probe_result = ProbeResult { duration_sec: 90.0, video_codec: "h264".into(), audio_codec: "aac".into(), width: 1920, height: 1080, keyframe_offsets_sec: vec![0.0, 10.0, 22.0, 31.0, 44.0, 58.0, 71.0, 85.0, 90.0] };
    orchestrator.handle_task_event(completed_event(probe_task.id, job.id, serde_json::to_value(&probe_result).unwrap())).await.unwrap();

    let tasks = store.list_tasks_for_job(job.id).await.unwrap();
    let transcodes: Vec<_> = tasks.iter().filter(|t| t.kind == TaskType::Transcode).cloned().collect();
    assert!(transcodes.len() >= 2);

    let orchestrator = Arc::new(orchestrator);
    let mut handles = Vec::new();
    for (i, task) in transcodes.iter().enumerate() {
        let orchestrator = orchestrator.clone();
        let job_id = job.id;
        let task_id = task.id;
        let result = serde_json::json!({ "output_path": format!("s3://out/{i}.mp4"), "duration_sec": 1.0, "size_bytes": 1 });
        handles.push(tokio::spawn(async move {
            orchestrator.handle_task_event(completed_event(task_id, job_id, result)).await.unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let tasks = store.list_tasks_for_job(job.id).await.unwrap();
    assert_eq!(tasks.iter().filter(|t| t.kind == TaskType::Stitch).count(), 1, "exactly one stitch task must exist even under concurrent delivery");
}

#[tokio::test]
async fn property_2_segment_completeness_feeds_stitch_with_every_sequence_index() {
    let (orchestrator, _bus, store) = harness();
    register_healthy_workers(&store, 4).await;

    let job = orchestrator
        .submit_job(SubmitJobRequest { user_id: Uuid::new_v4(), source_url: "s3://in/video.mp4".into(), source_type: SourceType::Url, profiles: vec![] })
        .await
        .unwrap();
    let probe_task = store.list_tasks_for_job(job.id).await.unwrap().remove(0);
    let probe_result = ProbeResult { duration_sec: 90.0, video_codec: "h264".into(), audio_codec: "aac".into(), width: 1920, height: 1080, keyframe_offsets_sec: vec![0.0, 10.0, 22.0, 31.0, 44.0, 58.0, 71.0, 85.0, 90.0] };
    orchestrator.handle_task_event(completed_event(probe_task.id, job.id, serde_json::to_value(&probe_result).unwrap())).await.unwrap();

    let tasks = store.list_tasks_for_job(job.id).await.unwrap();
    let mut transcodes: Vec<_> = tasks.iter().filter(|t| t.kind == TaskType::Transcode).cloned().collect();
    transcodes.sort_by_key(|t| t.sequence_index);
    let n = transcodes.len();

    for (i, task) in transcodes.iter().enumerate() {
        let result = serde_json::json!({ "output_path": format!("s3://out/{i}.mp4"), "duration_sec": 1.0, "size_bytes": 1 });
        orchestrator.handle_task_event(completed_event(task.id, job.id, result)).await.unwrap();
    }

    let tasks = store.list_tasks_for_job(job.id).await.unwrap();
    let stitch = tasks.iter().find(|t| t.kind == TaskType::Stitch).unwrap();
    let params: mf_core::model::StitchParams = serde_json::from_value(stitch.params.clone()).unwrap();
    assert_eq!(params.segment_output_keys.len(), n);

    let completed_indices: std::collections::BTreeSet<i32> =
        tasks.iter().filter(|t| t.kind == TaskType::Transcode && t.status == TaskStatus::Completed).map(|t| t.sequence_index).collect();
    let expected: std::collections::BTreeSet<i32> = (0..n as i32).collect();
    assert_eq!(completed_indices, expected);
}

#[tokio::test]
async fn log_event_is_persisted_without_touching_job_state() {
    let (orchestrator, _bus, store) = harness();
    let job = orchestrator
        .submit_job(SubmitJobRequest { user_id: Uuid::new_v4(), source_url: "s3://in/video.mp4".into(), source_type: SourceType::Url, profiles: vec![] })
        .await
        .unwrap();
    let probe_task = store.list_tasks_for_job(job.id).await.unwrap().remove(0);

    let log_message = TaskEventMessage { task_id: probe_task.id, job_id: job.id, event: TaskEventKind::Log, progress_pct: None, message: Some("probing source".into()), result: None };
    orchestrator.handle_task_event(log_message).await.unwrap();

    let logs = orchestrator.get_job_logs(job.id).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].message, "probing source");

    let job = store.get_job(job.id).await.unwrap();
    assert_eq!(job.status, JobStatus::Queued);
}

#[tokio::test]
async fn probe_completed_republishes_on_jobs_events_subject() {
    let (orchestrator, bus, store) = harness();
    register_healthy_workers(&store, 1).await;
    let mut sub = bus.subscribe(subjects::JOBS_EVENTS).await.unwrap();

    let job = orchestrator
        .submit_job(SubmitJobRequest { user_id: Uuid::new_v4(), source_url: "s3://in/video.mp4".into(), source_type: SourceType::Url, profiles: vec![] })
        .await
        .unwrap();
    let probe_task = store.list_tasks_for_job(job.id).await.unwrap().remove(0);

    let progress = TaskEventMessage { task_id: probe_task.id, job_id: job.id, event: TaskEventKind::Progress, progress_pct: Some(50), message: None, result: None };
    orchestrator.handle_task_event(progress).await.unwrap();

    let published = sub.next().await.unwrap();
    let decoded: TaskEventMessage = published.decode().unwrap();
    assert_eq!(decoded.progress_pct, Some(50));
}
