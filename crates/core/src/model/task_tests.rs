// SPDX-License-Identifier: MIT

use super::*;
use crate::model::job::JobId;

#[test]
fn new_task_is_pending_with_zero_attempts() {
    let task = Task::new(JobId::new(), TaskType::Probe, NO_SEQUENCE, serde_json::json!({}), Utc::now());
    assert_eq!(task.status, TaskStatus::Pending);
    assert_eq!(task.attempt_count, 0);
    assert!(!task.is_segment());
}

#[test]
fn segment_task_reports_is_segment() {
    let task = Task::new(JobId::new(), TaskType::Transcode, 3, serde_json::json!({}), Utc::now());
    assert!(task.is_segment());
}

#[test]
fn assign_increments_attempt_count_each_time() {
    let mut task = Task::new(JobId::new(), TaskType::Transcode, 0, serde_json::json!({}), Utc::now());
    task.assign("worker-a".into(), Utc::now());
    task.assign("worker-b".into(), Utc::now());
    assert_eq!(task.attempt_count, 2);
    assert_eq!(task.worker_id.as_deref(), Some("worker-b"));
}

#[test]
fn probe_result_round_trips_through_json() {
    let result = ProbeResult {
        duration_sec: 120.5,
        video_codec: "h264".into(),
        audio_codec: "aac".into(),
        width: 1920,
        height: 1080,
        keyframe_offsets_sec: vec![0.0, 2.0, 4.0],
    };
    let value = serde_json::to_value(&result).unwrap();
    let back: ProbeResult = serde_json::from_value(value).unwrap();
    assert_eq!(back.keyframe_offsets_sec, result.keyframe_offsets_sec);
}
