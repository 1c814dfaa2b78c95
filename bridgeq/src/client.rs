//! HTTP client for a remote bridge broker
//!
//! Used by delegate-topology callers to forward enqueues to the process
//! that owns the shared port, and by a host executor running in a
//! different process than the broker.

use crate::config::BridgeConfig;
use crate::error::{Error, Result};
use crate::message::{
  BridgeRequest, BridgeResponse, HealthResponse, PollResponse, QueueRequest, QueueResponse,
  ResponseAck,
};
use serde_json::Value;
use std::time::Duration;

/// Grace added on top of the bridge timeout so the HTTP call outlives the
/// broker-side timer and reports the broker's timeout error, not its own
const TRANSPORT_GRACE: Duration = Duration::from_millis(2_000);

/// HTTP client for a remote bridge broker
#[derive(Clone)]
pub struct BridgeHttpClient {
  base_url: String,
  default_timeout: Duration,
  http: reqwest::Client,
}

impl BridgeHttpClient {
  /// Create a client for the broker at the configured address
  pub fn new(config: &BridgeConfig) -> Self {
    Self {
      base_url: config.base_url(),
      default_timeout: config.default_timeout,
      http: reqwest::Client::new(),
    }
  }

  /// Create a client for the broker at the given base URL
  pub fn from_url<S: Into<String>>(base_url: S) -> Self {
    Self {
      base_url: base_url.into(),
      default_timeout: crate::config::DEFAULT_TIMEOUT,
      http: reqwest::Client::new(),
    }
  }

  /// Get the broker base URL
  pub fn base_url(&self) -> &str {
    &self.base_url
  }

  /// Enqueue an operation on the remote broker and await its result
  pub async fn enqueue(
    &self,
    operation: &str,
    params: Value,
    timeout: Option<Duration>,
  ) -> Result<Value> {
    let bridge_timeout = timeout.unwrap_or(self.default_timeout);
    let body = QueueRequest {
      operation: operation.to_string(),
      params,
      timeout_ms: Some(bridge_timeout.as_millis() as u64),
    };
    let response = self
      .http
      .post(format!("{}/queue", self.base_url))
      .json(&body)
      .timeout(bridge_timeout + TRANSPORT_GRACE)
      .send()
      .await?
      .error_for_status()?;
    let result: QueueResponse = response.json().await?;
    result.into_result()
  }

  /// Drain the remote broker's queue
  pub async fn poll(&self) -> Result<Vec<BridgeRequest>> {
    let response = self
      .http
      .get(format!("{}/poll", self.base_url))
      .send()
      .await?
      .error_for_status()?;
    let poll: PollResponse = response.json().await?;
    Ok(poll.requests)
  }

  /// Deliver a result to the remote broker
  pub async fn respond(&self, response: &BridgeResponse) -> Result<()> {
    let ack: ResponseAck = self
      .http
      .post(format!("{}/response", self.base_url))
      .json(response)
      .send()
      .await?
      .error_for_status()?
      .json()
      .await?;
    if !ack.success {
      return Err(Error::invalid_message("response delivery not acknowledged"));
    }
    Ok(())
  }

  /// Fetch the remote broker's health snapshot
  pub async fn health(&self) -> Result<HealthResponse> {
    let health: HealthResponse = self
      .http
      .get(format!("{}/health", self.base_url))
      .timeout(Duration::from_millis(1_000))
      .send()
      .await?
      .error_for_status()?
      .json()
      .await?;
    Ok(health)
  }

  /// Check whether a broker answers at the base URL
  pub async fn is_running(&self) -> bool {
    self.health().await.is_ok()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_client_base_url_from_config() {
    let config = BridgeConfig::new().with_port(39000);
    let client = BridgeHttpClient::new(&config);
    assert_eq!(client.base_url(), "http://127.0.0.1:39000");
  }

  #[tokio::test]
  async fn test_is_running_false_without_broker() {
    // Port 9 (discard) is never a bridge broker
    let client = BridgeHttpClient::from_url("http://127.0.0.1:9");
    assert!(!client.is_running().await);
  }
}
