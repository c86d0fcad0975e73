// SPDX-License-Identifier: MIT

//! Object storage fetch/upload, dispatched on URL scheme. `s3://` goes
//! through `aws-sdk-s3`; `http(s)://` through `reqwest`; `file://` is read
//! straight off the execution image's local disk (used in tests and
//! single-node deployments).

use crate::error::WorkerError;

#[derive(Clone)]
pub struct Storage {
    s3: aws_sdk_s3::Client,
    http: reqwest::Client,
}

impl Storage {
    pub async fn from_env() -> Self {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self { s3: aws_sdk_s3::Client::new(&config), http: reqwest::Client::new() }
    }

    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>, WorkerError> {
        if let Some(rest) = url.strip_prefix("s3://") {
            let (bucket, key) = split_bucket_key(rest)?;
            let output = self.s3.get_object().bucket(bucket).key(key).send().await.map_err(|e| WorkerError::Storage(e.to_string()))?;
            let bytes = output.body.collect().await.map_err(|e| WorkerError::Storage(e.to_string()))?;
            Ok(bytes.into_bytes().to_vec())
        } else if url.starts_with("http://") || url.starts_with("https://") {
            let response = self.http.get(url).send().await.map_err(|e| WorkerError::Storage(e.to_string()))?;
            let bytes = response.error_for_status().map_err(|e| WorkerError::Storage(e.to_string()))?.bytes().await.map_err(|e| WorkerError::Storage(e.to_string()))?;
            Ok(bytes.to_vec())
        } else if let Some(path) = url.strip_prefix("file://") {
            Ok(tokio::fs::read(path).await?)
        } else {
            Err(WorkerError::UnsupportedScheme(url.to_string()))
        }
    }

    pub async fn upload(&self, url: &str, bytes: Vec<u8>) -> Result<(), WorkerError> {
        if let Some(rest) = url.strip_prefix("s3://") {
            let (bucket, key) = split_bucket_key(rest)?;
            self.s3
                .put_object()
                .bucket(bucket)
                .key(key)
                .body(aws_sdk_s3::primitives::ByteStream::from(bytes))
                .send()
                .await
                .map_err(|e| WorkerError::Storage(e.to_string()))?;
            Ok(())
        } else if url.starts_with("http://") || url.starts_with("https://") {
            self.http.put(url).body(bytes).send().await.map_err(|e| WorkerError::Storage(e.to_string()))?.error_for_status().map_err(|e| WorkerError::Storage(e.to_string()))?;
            Ok(())
        } else if let Some(path) = url.strip_prefix("file://") {
            if let Some(parent) = std::path::Path::new(path).parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(path, bytes).await?;
            Ok(())
        } else {
            Err(WorkerError::UnsupportedScheme(url.to_string()))
        }
    }
}

fn split_bucket_key(rest: &str) -> Result<(&str, &str), WorkerError> {
    rest.split_once('/').ok_or_else(|| WorkerError::UnsupportedScheme(format!("s3://{rest}")))
}

#[cfg(test)]
#[path = "storage_tests.rs"]
mod tests;
