// SPDX-License-Identifier: MIT

//! **probe** (spec.md §4.4): resolve the source, run `ffprobe`, emit
//! `{duration, keyframes[], codecs, container, bitrate}`.

use mf_core::model::ProbeResult;
use serde_json::Value;
use tokio::process::Command;

use crate::error::WorkerError;
use crate::storage::Storage;

pub async fn run(source_key: &str, storage: &Storage) -> Result<ProbeResult, WorkerError> {
    let bytes = storage.fetch(source_key).await?;
    let input = write_temp_input(&bytes).await?;

    let format = run_ffprobe_json(input.path(), &["-show_format", "-show_streams"]).await?;
    let keyframe_offsets_sec = run_ffprobe_keyframes(input.path()).await.unwrap_or_default();

    let streams = format.get("streams").and_then(Value::as_array).cloned().unwrap_or_default();
    let video = streams.iter().find(|s| s.get("codec_type").and_then(Value::as_str) == Some("video"));
    let audio = streams.iter().find(|s| s.get("codec_type").and_then(Value::as_str) == Some("audio"));

    let duration_sec = format
        .get("format")
        .and_then(|f| f.get("duration"))
        .and_then(Value::as_str)
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(0.0);

    Ok(ProbeResult {
        duration_sec,
        video_codec: video.and_then(|s| s.get("codec_name")).and_then(Value::as_str).unwrap_or("unknown").to_string(),
        audio_codec: audio.and_then(|s| s.get("codec_name")).and_then(Value::as_str).unwrap_or("unknown").to_string(),
        width: video.and_then(|s| s.get("width")).and_then(Value::as_u64).unwrap_or(0) as u32,
        height: video.and_then(|s| s.get("height")).and_then(Value::as_u64).unwrap_or(0) as u32,
        keyframe_offsets_sec,
    })
}

async fn write_temp_input(bytes: &[u8]) -> Result<tempfile::NamedTempFile, WorkerError> {
    let file = tempfile::NamedTempFile::new()?;
    tokio::fs::write(file.path(), bytes).await?;
    Ok(file)
}

async fn run_ffprobe_json(input: &std::path::Path, extra_args: &[&str]) -> Result<Value, WorkerError> {
    let mut command = Command::new("ffprobe");
    command.args(["-v", "quiet", "-print_format", "json"]).args(extra_args).arg(input);
    let output = command.output().await.map_err(|e| WorkerError::SubprocessSpawn("ffprobe", e))?;
    if !output.status.success() {
        return Err(WorkerError::SubprocessFailed("ffprobe", output.status.code().unwrap_or(-1)));
    }
    serde_json::from_slice(&output.stdout).map_err(|e| WorkerError::MalformedOutput("ffprobe", e.to_string()))
}

/// Keyframe (IDR) offsets, used downstream to snap segment boundaries.
async fn run_ffprobe_keyframes(input: &std::path::Path) -> Result<Vec<f64>, WorkerError> {
    let output = Command::new("ffprobe")
        .args(["-v", "quiet", "-select_streams", "v", "-skip_frame", "nokey", "-show_entries", "frame=pkt_pts_time", "-print_format", "json"])
        .arg(input)
        .output()
        .await
        .map_err(|e| WorkerError::SubprocessSpawn("ffprobe", e))?;
    if !output.status.success() {
        return Err(WorkerError::SubprocessFailed("ffprobe", output.status.code().unwrap_or(-1)));
    }
    let parsed: Value = serde_json::from_slice(&output.stdout).map_err(|e| WorkerError::MalformedOutput("ffprobe", e.to_string()))?;
    let frames = parsed.get("frames").and_then(Value::as_array).cloned().unwrap_or_default();
    Ok(frames
        .iter()
        .filter_map(|f| f.get("pkt_pts_time").and_then(Value::as_str))
        .filter_map(|s| s.parse::<f64>().ok())
        .collect())
}
