//! Rate-limit-aware HTTP helpers
//!
//! Every outbound call in this crate goes through [`send_with_retry`]: HTTP
//! 429 is retried up to 4 attempts total with exponential backoff (500 ms,
//! doubling), every other non-success status is terminal on first sight.
//! This layer knows nothing about identities, sessions, or records.

use std::time::Duration;

use reqwest::StatusCode;
use tracing::debug;

use crate::error::{ClientError, Result};

const MAX_ATTEMPTS: u32 = 4;
const BASE_DELAY_MS: u64 = 500;

/// Send a request, retrying only on HTTP 429.
///
/// Returns the final response, which may still carry a non-success status —
/// callers decide how a given status maps into the error taxonomy. Fails
/// with `Http(429)` once all attempts are rate-limited.
pub(crate) async fn send_with_retry(builder: reqwest::RequestBuilder) -> Result<reqwest::Response> {
    for attempt in 0..MAX_ATTEMPTS {
        let request = builder
            .try_clone()
            .ok_or_else(|| ClientError::Validation("request body is not replayable".to_string()))?;
        let response = request.send().await?;

        if response.status() != StatusCode::TOO_MANY_REQUESTS {
            return Ok(response);
        }

        if attempt + 1 < MAX_ATTEMPTS {
            let delay = Duration::from_millis(BASE_DELAY_MS << attempt);
            debug!(attempt, delay_ms = delay.as_millis() as u64, "rate limited, backing off");
            tokio::time::sleep(delay).await;
        }
    }

    Err(ClientError::Http(StatusCode::TOO_MANY_REQUESTS.as_u16()))
}

/// GET a URL and parse the body as JSON.
///
/// Success is any 2xx; the body is returned as-is with no schema validation.
/// Non-2xx (after the 429 retry policy) fails with `Http(status)`.
pub async fn fetch_json(client: &reqwest::Client, url: &str) -> Result<serde_json::Value> {
    let response = send_with_retry(client.get(url)).await?;
    let status = response.status();
    if !status.is_success() {
        return Err(ClientError::Http(status.as_u16()));
    }
    Ok(response.json().await?)
}

/// Extract the server-provided `message` field from an XRPC error body, if any
pub(crate) async fn server_message(response: reqwest::Response) -> Option<String> {
    let body: serde_json::Value = response.json().await.ok()?;
    body.get("message")
        .and_then(|m| m.as_str())
        .map(|m| m.to_string())
}
