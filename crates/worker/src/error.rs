// SPDX-License-Identifier: MIT

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("bus error: {0}")]
    Bus(#[from] mf_bus::BusError),
    #[error("unsupported url scheme in {0:?}")]
    UnsupportedScheme(String),
    #[error("object storage error: {0}")]
    Storage(String),
    #[error("subprocess {0} exited with status {1}")]
    SubprocessFailed(&'static str, i32),
    #[error("subprocess {0} could not be started: {1}")]
    SubprocessSpawn(&'static str, std::io::Error),
    #[error("failed to parse {0} output: {1}")]
    MalformedOutput(&'static str, String),
    #[error("missing segment(s): {0:?}")]
    MissingSegments(Vec<String>),
    #[error("no plugin registered for task kind {0:?}")]
    NoPlugin(String),
    #[error("plugin {0} failed: {1}")]
    PluginFailed(String, String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
