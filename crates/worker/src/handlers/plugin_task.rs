// SPDX-License-Identifier: MIT

//! **restream** / **manifest** (spec.md §4.4): both delegate entirely to
//! whatever plugin is registered for the task's own kind string.

use serde_json::Value;

use crate::error::WorkerError;
use crate::plugin::PluginRegistry;

pub async fn run(kind: &str, params: Value, registry: &PluginRegistry) -> Result<Value, WorkerError> {
    let plugin = registry.get(kind).ok_or_else(|| WorkerError::NoPlugin(kind.to_string()))?;
    plugin.invoke(params).await
}

#[cfg(test)]
#[path = "plugin_task_tests.rs"]
mod tests;
