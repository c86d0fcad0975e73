// SPDX-License-Identifier: MIT

//! `restream`/`manifest` task delegation. The plugin wire format itself is
//! out of spec's scope; this crate only needs a trait boundary and one
//! concrete implementation that shells a binary found under `PLUGIN_DIR`
//! and speaks a single-shot JSON request/response over its stdio. Shaped
//! after the teacher's `AgentAdapter`: one trait, one registry keyed by
//! kind, dispatch by the task's own kind string.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::warn;

use crate::error::WorkerError;

#[async_trait]
pub trait PluginClient: Send + Sync {
    async fn invoke(&self, params: Value) -> Result<Value, WorkerError>;
}

/// Invokes a plugin binary once per call: writes `params` as JSON to its
/// stdin, closes it, and parses its stdout as the JSON result. A nonzero
/// exit status is a failure regardless of what the plugin printed.
pub struct ProcessPluginClient {
    binary: PathBuf,
}

#[async_trait]
impl PluginClient for ProcessPluginClient {
    async fn invoke(&self, params: Value) -> Result<Value, WorkerError> {
        let mut child = Command::new(&self.binary)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .spawn()
            .map_err(|e| WorkerError::SubprocessSpawn("plugin", e))?;

        let payload = serde_json::to_vec(&params)?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(&payload).await?;
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            return Err(WorkerError::PluginFailed(self.binary.display().to_string(), stderr));
        }

        serde_json::from_slice(&output.stdout).map_err(|e| WorkerError::MalformedOutput("plugin", e.to_string()))
    }
}

/// Maps a task kind (`restream`, `manifest`, ...) to the plugin binary that
/// handles it. Populated once at startup by scanning `PLUGIN_DIR` for
/// executables named after the kind they implement.
#[derive(Default)]
pub struct PluginRegistry {
    clients: HashMap<String, ProcessPluginClient>,
}

impl PluginRegistry {
    pub fn scan(plugin_dir: &Path) -> Self {
        let mut clients = HashMap::new();
        let entries = match std::fs::read_dir(plugin_dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, dir = %plugin_dir.display(), "plugin dir not readable, restream/manifest unavailable");
                return Self { clients };
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            let Some(kind) = path.file_stem().and_then(|s| s.to_str()) else { continue };
            clients.insert(kind.to_string(), ProcessPluginClient { binary: path.clone() });
        }
        Self { clients }
    }

    pub fn get(&self, kind: &str) -> Option<&dyn PluginClient> {
        self.clients.get(kind).map(|c| c as &dyn PluginClient)
    }

    pub fn kinds(&self) -> Vec<String> {
        self.clients.keys().cloned().collect()
    }
}
