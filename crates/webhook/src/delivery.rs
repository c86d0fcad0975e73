// SPDX-License-Identifier: MIT

//! HTTP delivery of a single webhook payload, with the signing, headers,
//! and retry schedule spec.md §4.7 names.

use std::time::Duration;

use reqwest::Client;
use tracing::warn;

use crate::retry::{backoff_for, MAX_ATTEMPTS};
use crate::signature;

const SERVICE_NAME: &str = "mediaforge";
const CLIENT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct WebhookDelivery {
    client: Client,
}

impl Default for WebhookDelivery {
    fn default() -> Self {
        Self::new()
    }
}

impl WebhookDelivery {
    pub fn new() -> Self {
        #[allow(clippy::expect_used)]
        let client = Client::builder().timeout(CLIENT_TIMEOUT).build().expect("reqwest client configuration is static and valid");
        Self { client }
    }

    /// Performs one HTTP attempt. `Ok(true)` means success (status < 300).
    async fn attempt(&self, url: &str, body: &[u8], secret: Option<&str>) -> bool {
        let mut request = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .header("User-Agent", format!("{SERVICE_NAME}/{}", env!("CARGO_PKG_VERSION")))
            .header(format!("X-{}-Event", capitalize(SERVICE_NAME)), "true")
            .body(body.to_vec());

        if let Some(secret) = secret {
            let signature = signature::sign(secret, body);
            request = request.header(format!("X-{}-Signature", capitalize(SERVICE_NAME)), format!("sha256={signature}"));
        }

        match request.send().await {
            Ok(response) => response.status().as_u16() < 300,
            Err(e) => {
                warn!(error = %e, url, "webhook delivery attempt failed");
                false
            }
        }
    }

    /// Delivers with up to [`MAX_ATTEMPTS`] total tries, exponential backoff
    /// between retries. Returns whether any attempt succeeded.
    pub async fn deliver_with_retry(&self, url: &str, body: &[u8], secret: Option<&str>) -> bool {
        for attempt in 1..=MAX_ATTEMPTS {
            if self.attempt(url, body, secret).await {
                return true;
            }
            if attempt < MAX_ATTEMPTS {
                tokio::time::sleep(backoff_for(attempt)).await;
            }
        }
        false
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
#[path = "delivery_tests.rs"]
mod tests;
