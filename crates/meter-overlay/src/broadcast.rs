//! Broadcast client.
//!
//! Provides a trait-based abstraction for submitting transitions to the overlay.
//! This allows for:
//! - Dependency injection for testing
//! - Separation of wallet assembly from transport
//! - An in-memory overlay for local runs

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use meter_core::Txid;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{OverlayError, OverlayResult};

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

/// Topic every meter transaction is delivered under.
pub const METER_TOPIC: &str = "tm_meter";

/// Default timeout for overlay requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Outcome reported by the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BroadcastStatus {
    Success,
    Error,
}

/// Result of a broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastResult {
    pub status: BroadcastStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub txid: Option<Txid>,
    #[serde(default)]
    pub description: String,
}

impl BroadcastResult {
    pub fn success(txid: Txid, description: impl Into<String>) -> Self {
        Self {
            status: BroadcastStatus::Success,
            txid: Some(txid),
            description: description.into(),
        }
    }

    pub fn error(description: impl Into<String>) -> Self {
        Self {
            status: BroadcastStatus::Error,
            txid: None,
            description: description.into(),
        }
    }

    /// Check if the overlay accepted the transaction.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == BroadcastStatus::Success
    }
}

/// Trait for submitting atomic envelopes to the overlay.
///
/// No idempotency: resubmitting a spent input is reported as an error result.
pub trait Broadcaster: Send + Sync {
    /// Submit an envelope whose subject is the transaction to broadcast.
    fn submit(&self, envelope: Vec<u8>) -> BoxFuture<'_, BroadcastResult>;
}

/// Arc wrapper for Broadcaster trait objects.
pub type DynBroadcaster = Arc<dyn Broadcaster>;

/// HTTP broadcaster posting envelopes to `{url}/submit`.
pub struct HttpBroadcaster {
    client: Client,
    submit_url: String,
    topics_header: String,
}

impl HttpBroadcaster {
    /// Create a broadcaster scoped to `topic`.
    ///
    /// # Arguments
    /// * `base_url` - overlay base URL (e.g., "https://overlay.example.com")
    /// * `topic` - topic manager the envelope is delivered to (normally [`METER_TOPIC`])
    /// * `timeout` - per-request timeout
    pub fn new(base_url: &str, topic: &str, timeout: Duration) -> OverlayResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| OverlayError::HttpClient(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            submit_url: format!("{}/submit", base_url.trim_end_matches('/')),
            topics_header: serde_json::to_string(&[topic])?,
        })
    }

    async fn post(&self, envelope: Vec<u8>) -> OverlayResult<BroadcastResult> {
        let response = self
            .client
            .post(&self.submit_url)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .header("X-Topics", &self.topics_header)
            .body(envelope)
            .send()
            .await
            .map_err(|e| OverlayError::HttpClient(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OverlayError::HttpClient(format!("HTTP {status}: {body}")));
        }

        response
            .json::<BroadcastResult>()
            .await
            .map_err(|e| OverlayError::HttpClient(format!("Failed to parse response: {e}")))
    }
}

impl Broadcaster for HttpBroadcaster {
    fn submit(&self, envelope: Vec<u8>) -> BoxFuture<'_, BroadcastResult> {
        Box::pin(async move {
            let bytes = envelope.len();
            debug!(url = %self.submit_url, bytes, "Submitting envelope");
            match self.post(envelope).await {
                Ok(result) => {
                    info!(status = ?result.status, txid = ?result.txid, "Broadcast answered");
                    result
                }
                Err(e) => {
                    warn!(error = %e, "Broadcast transport failed");
                    BroadcastResult::error(e.to_string())
                }
            }
        })
    }
}

/// Mock broadcaster for testing.
#[derive(Debug)]
pub struct MockBroadcaster {
    /// Recorded submissions for verification.
    submissions: parking_lot::Mutex<Vec<Vec<u8>>>,
    /// Next result to return. `None` echoes success.
    next_result: parking_lot::Mutex<Option<BroadcastResult>>,
}

impl Default for MockBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBroadcaster {
    pub fn new() -> Self {
        Self {
            submissions: parking_lot::Mutex::new(Vec::new()),
            next_result: parking_lot::Mutex::new(None),
        }
    }

    /// Set the result returned by every following submission.
    pub fn set_next_result(&self, result: BroadcastResult) {
        *self.next_result.lock() = Some(result);
    }

    /// Get recorded submissions.
    pub fn submissions(&self) -> Vec<Vec<u8>> {
        self.submissions.lock().clone()
    }
}

impl Broadcaster for MockBroadcaster {
    fn submit(&self, envelope: Vec<u8>) -> BoxFuture<'_, BroadcastResult> {
        Box::pin(async move {
            let txid = meter_core::Envelope::from_bytes(&envelope)
                .map(|e| e.subject().txid())
                .ok();
            self.submissions.lock().push(envelope);
            match self.next_result.lock().clone() {
                Some(result) => result,
                None => match txid {
                    Some(txid) => BroadcastResult::success(txid, "accepted"),
                    None => BroadcastResult::error("malformed envelope"),
                },
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broadcast_result_wire_format() {
        let json = r#"{"status":"error","description":"double spend"}"#;
        let result: BroadcastResult = serde_json::from_str(json).unwrap();
        assert!(!result.is_success());
        assert_eq!(result.txid, None);
        assert_eq!(result.description, "double spend");

        let ok = BroadcastResult::success(Txid::ZERO, "ok");
        let value = serde_json::to_value(&ok).unwrap();
        assert_eq!(value["status"], "success");
        assert_eq!(value["txid"], Txid::ZERO.to_string());
    }

    #[test]
    fn test_topics_header() {
        let broadcaster = HttpBroadcaster::new("http://localhost:8080/", METER_TOPIC, DEFAULT_TIMEOUT).unwrap();
        assert_eq!(broadcaster.topics_header, r#"["tm_meter"]"#);
        assert_eq!(broadcaster.submit_url, "http://localhost:8080/submit");
    }

    #[tokio::test]
    async fn test_mock_broadcaster_records_and_overrides() {
        let mock = MockBroadcaster::new();
        let envelope = meter_core::Envelope::single(meter_core::Transaction::new(
            vec![],
            vec![meter_core::TxOutput::new(1, vec![0x51])],
        ));
        let first = mock.submit(envelope.to_bytes()).await;
        assert!(first.is_success());
        assert_eq!(first.txid, Some(envelope.subject().txid()));

        mock.set_next_result(BroadcastResult::error("rejected"));
        let second = mock.submit(envelope.to_bytes()).await;
        assert!(!second.is_success());
        assert_eq!(mock.submissions().len(), 2);
    }

    #[tokio::test]
    async fn test_unreachable_overlay_reports_error_status() {
        // Port 9 (discard) on localhost is not expected to run an HTTP server.
        let broadcaster =
            HttpBroadcaster::new("http://127.0.0.1:9", METER_TOPIC, Duration::from_millis(500)).unwrap();
        let result = broadcaster.submit(vec![1, 2, 3]).await;
        assert_eq!(result.status, BroadcastStatus::Error);
        assert!(!result.description.is_empty());
    }
}
