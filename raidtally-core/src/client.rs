//! Rate-limited fetch client for the Bungie API.
//!
//! One [`ApiClient`] is shared by every stage of the pipeline, so a single
//! semaphore bounds the number of in-flight requests process-wide. Each
//! logical fetch classifies failures into the crate's error taxonomy and
//! is wrapped in the retry policy.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio::sync::Semaphore;

use crate::error::{Error, Result};
use crate::retry::{RetryPolicy, retry};

/// Bungie platform API root.
pub const DEFAULT_BASE_URL: &str = "https://www.bungie.net/Platform";

/// Default ceiling on simultaneous in-flight requests.
pub const DEFAULT_CONCURRENCY: usize = 150;

/// Per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// How much of an error response body is kept for diagnostics.
const BODY_SNIPPET_CHARS: usize = 200;

/// Every Bungie response is wrapped in this envelope. `ErrorStatus`
/// values other than `"Success"` are application-level failures even on
/// HTTP 200.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "ErrorStatus")]
    error_status: String,
    #[serde(rename = "Message", default)]
    message: String,
    #[serde(rename = "Response")]
    response: Option<serde_json::Value>,
}

/// Rate-limited, retrying HTTP client.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    permits: Arc<Semaphore>,
    retry: RetryPolicy,
}

impl ApiClient {
    /// Create a client with the default base URL, concurrency ceiling and
    /// retry policy.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            permits: Arc::new(Semaphore::new(DEFAULT_CONCURRENCY)),
            retry: RetryPolicy::default(),
        })
    }

    /// Set the ceiling on simultaneous in-flight requests.
    #[must_use]
    pub fn with_concurrency(mut self, limit: usize) -> Self {
        self.permits = Arc::new(Semaphore::new(limit.max(1)));
        self
    }

    /// Point the client at a different API root (used by tests).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Replace the retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    /// Fetch `{base_url}{path}` and deserialize the envelope's `Response`
    /// field. Transient failures are retried per the client's policy; the
    /// final error after exhaustion is returned unchanged.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        retry(self.retry, || self.get_once(&url)).await
    }

    /// One attempt: holds a concurrency permit for the duration of the
    /// network call only, so backoff sleeps never occupy a slot.
    async fn get_once<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let _permit = self
            .permits
            .acquire()
            .await
            .expect("request semaphore is never closed");

        let response = self
            .http
            .get(url)
            .header("X-API-Key", &self.api_key)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if status.as_u16() >= 400 {
            return Err(Error::Transport {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        decode_envelope(&body)
    }
}

/// Classify and unwrap a Bungie envelope body.
fn decode_envelope<T: DeserializeOwned>(body: &str) -> Result<T> {
    let envelope: Envelope = serde_json::from_str(body)?;
    if envelope.error_status != "Success" {
        return Err(Error::Upstream {
            status: envelope.error_status,
            message: envelope.message,
        });
    }
    match envelope.response {
        Some(value) => Ok(serde_json::from_value(value)?),
        None => Err(Error::Malformed(
            "success envelope without a Response field".to_string(),
        )),
    }
}

fn truncate_body(body: &str) -> String {
    body.chars().take(BODY_SNIPPET_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Payload {
        count: u64,
    }

    #[test]
    fn decode_unwraps_success_envelope() {
        let body = r#"{"ErrorStatus":"Success","Message":"Ok","Response":{"count":7}}"#;
        let payload: Payload = decode_envelope(body).unwrap();
        assert_eq!(payload, Payload { count: 7 });
    }

    #[test]
    fn decode_rejects_upstream_error_regardless_of_http_status() {
        let body =
            r#"{"ErrorStatus":"SystemDisabled","Message":"down for maintenance","Response":null}"#;
        let err = decode_envelope::<Payload>(body).unwrap_err();
        match err {
            Error::Upstream { status, message } => {
                assert_eq!(status, "SystemDisabled");
                assert_eq!(message, "down for maintenance");
            }
            other => panic!("unexpected error: {other}"),
        }
        let body = r#"{"ErrorStatus":"SystemDisabled","Message":"down"}"#;
        assert!(decode_envelope::<Payload>(body).unwrap_err().is_transient());
    }

    #[test]
    fn decode_flags_missing_response_as_malformed() {
        let body = r#"{"ErrorStatus":"Success","Message":"Ok"}"#;
        let err = decode_envelope::<Payload>(body).unwrap_err();
        assert!(matches!(err, Error::Malformed(_)));
        assert!(!err.is_transient());
    }

    #[test]
    fn decode_flags_invalid_json_as_fatal() {
        let err = decode_envelope::<Payload>("<html>502</html>").unwrap_err();
        assert!(matches!(err, Error::Json(_)));
        assert!(!err.is_transient());
    }

    #[test]
    fn body_snippet_is_capped_at_200_chars() {
        let long = "x".repeat(1000);
        assert_eq!(truncate_body(&long).len(), 200);
        assert_eq!(truncate_body("short"), "short");
    }
}
