// SPDX-License-Identifier: MIT

//! Dispatches a claimed task to its handler by [`TaskEnvelope::kind`]'s
//! raw string (the wire type doesn't carry a typed [`TaskType`]), returning
//! the handler's JSON result and, where applicable, the output object's key.

mod plugin_task;
mod probe;
mod stitch;
mod transcode;

use mf_core::model::{ProbeParams, StitchParams, TranscodeParams};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::WorkerError;
use crate::plugin::PluginRegistry;
use crate::storage::Storage;

pub struct HandlerOutcome {
    pub result: Value,
    pub output_key: Option<String>,
}

pub async fn dispatch(
    kind: &str,
    params: Value,
    storage: &Storage,
    plugins: &PluginRegistry,
    progress: mpsc::UnboundedSender<u8>,
) -> Result<HandlerOutcome, WorkerError> {
    match kind {
        "probe" => {
            let params: ProbeParams = serde_json::from_value(params)?;
            let result = probe::run(&params.source_key, storage).await?;
            Ok(HandlerOutcome { result: serde_json::to_value(result)?, output_key: None })
        }
        "transcode" => {
            let params: TranscodeParams = serde_json::from_value(params)?;
            let result = transcode::run(&params, storage, progress).await?;
            let output_key = result.output_key.clone();
            Ok(HandlerOutcome { result: serde_json::to_value(result)?, output_key: Some(output_key) })
        }
        "stitch" => {
            let params: StitchParams = serde_json::from_value(params)?;
            let result = stitch::run(&params, storage).await?;
            let output_key = result.output_key.clone();
            Ok(HandlerOutcome { result: serde_json::to_value(result)?, output_key: Some(output_key) })
        }
        "restream" | "manifest" => {
            let result = plugin_task::run(kind, params, plugins).await?;
            Ok(HandlerOutcome { result, output_key: None })
        }
        other => Err(WorkerError::NoPlugin(other.to_string())),
    }
}
