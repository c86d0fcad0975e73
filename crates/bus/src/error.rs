// SPDX-License-Identifier: MIT

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BusError {
    #[error("failed to publish to {subject}: {source}")]
    Publish {
        subject: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("failed to subscribe to {subject}: {source}")]
    Subscribe {
        subject: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("failed to initialize streams: {0}")]
    Init(String),
    #[error("bus is closed")]
    Closed,
    #[error("message payload was not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),
}
