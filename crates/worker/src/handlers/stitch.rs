// SPDX-License-Identifier: MIT

//! **stitch** (spec.md §4.4): resolve every segment, verify they all exist,
//! concatenate them in order, and upload the result.

use std::io::Write;

use mf_core::model::{StitchParams, StitchResult};
use tokio::process::Command;

use crate::error::WorkerError;
use crate::storage::Storage;

pub async fn run(params: &StitchParams, storage: &Storage) -> Result<StitchResult, WorkerError> {
    let mut local_paths = Vec::with_capacity(params.segment_output_keys.len());
    let mut missing = Vec::new();

    for key in &params.segment_output_keys {
        match storage.fetch(key).await {
            Ok(bytes) => {
                let file = tempfile::NamedTempFile::new()?;
                tokio::fs::write(file.path(), &bytes).await?;
                local_paths.push(file);
            }
            Err(_) => missing.push(key.clone()),
        }
    }

    if !missing.is_empty() {
        return Err(WorkerError::MissingSegments(missing));
    }

    let concat_list = build_concat_list(&local_paths).await?;
    let output = tempfile::NamedTempFile::new()?;

    let status = Command::new("ffmpeg")
        .args(["-y", "-f", "concat", "-safe", "0", "-i"])
        .arg(concat_list.path())
        .args(["-c", "copy"])
        .arg(output.path())
        .status()
        .await
        .map_err(|e| WorkerError::SubprocessSpawn("ffmpeg", e))?;

    if !status.success() {
        return Err(WorkerError::SubprocessFailed("ffmpeg", status.code().unwrap_or(-1)));
    }

    let output_bytes = tokio::fs::read(output.path()).await?;
    let size_bytes = output_bytes.len() as u64;
    storage.upload(&params.output_url, output_bytes).await?;

    let duration_sec = probe_duration(output.path()).await.unwrap_or(0.0);
    Ok(StitchResult { output_key: params.output_url.clone(), duration_sec, size_bytes })
}

async fn build_concat_list(segments: &[tempfile::NamedTempFile]) -> Result<tempfile::NamedTempFile, WorkerError> {
    let mut list = tempfile::NamedTempFile::new()?;
    for segment in segments {
        list.write_all(format!("file '{}'\n", segment.path().display()).as_bytes())?;
    }
    list.flush()?;
    Ok(list)
}

async fn probe_duration(path: &std::path::Path) -> Result<f64, WorkerError> {
    let output = Command::new("ffprobe")
        .args(["-v", "quiet", "-print_format", "json", "-show_format"])
        .arg(path)
        .output()
        .await
        .map_err(|e| WorkerError::SubprocessSpawn("ffprobe", e))?;
    if !output.status.success() {
        return Err(WorkerError::SubprocessFailed("ffprobe", output.status.code().unwrap_or(-1)));
    }
    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    Ok(parsed.get("format").and_then(|f| f.get("duration")).and_then(serde_json::Value::as_str).and_then(|s| s.parse().ok()).unwrap_or(0.0))
}

#[cfg(test)]
#[path = "stitch_tests.rs"]
mod tests;
