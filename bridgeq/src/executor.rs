//! Host-side poll worker
//!
//! The sandboxed host cannot accept connections; it can only reach out.
//! [`HostExecutor`] is that outbound side: an interval loop that drains
//! the broker via `GET /poll`, hands each request to an
//! [`OperationHandler`], and posts exactly one result per request via
//! `POST /response`. Handler failures become `success: false` results, so
//! the caller's await always settles with something meaningful.

use crate::client::BridgeHttpClient;
use crate::error::Result;
use crate::message::{BridgeRequest, BridgeResponse};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Executes one opaque `(operation, params)` pair on the host
///
/// Implementations carry the actual domain behavior; the executor never
/// interprets operations itself.
#[async_trait]
pub trait OperationHandler: Send + Sync {
  async fn execute(&self, operation: &str, params: Value) -> Result<Value>;
}

/// Poll worker configuration
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
  /// Poll cadence
  pub poll_interval: Duration,
}

impl Default for ExecutorConfig {
  fn default() -> Self {
    Self {
      poll_interval: Duration::from_millis(1_000),
    }
  }
}

/// Host-side poll worker
pub struct HostExecutor {
  client: BridgeHttpClient,
  handler: Arc<dyn OperationHandler>,
  config: ExecutorConfig,
  done: Arc<AtomicBool>,
}

impl HostExecutor {
  /// Create a new poll worker
  pub fn new(client: BridgeHttpClient, handler: Arc<dyn OperationHandler>) -> Self {
    Self {
      client,
      handler,
      config: ExecutorConfig::default(),
      done: Arc::new(AtomicBool::new(false)),
    }
  }

  /// Set the poll cadence
  pub fn with_poll_interval(mut self, interval: Duration) -> Self {
    self.config.poll_interval = interval;
    self
  }

  /// Start the poll loop
  pub fn start(self: Arc<Self>) -> JoinHandle<()> {
    tokio::spawn(async move {
      let mut interval = tokio::time::interval(self.config.poll_interval);
      loop {
        interval.tick().await;
        if self.done.load(Ordering::Relaxed) {
          debug!("host executor: shutting down");
          break;
        }
        match self.client.poll().await {
          Ok(requests) => {
            for request in requests {
              self.dispatch(request).await;
            }
          }
          // The broker may not be up yet; keep polling
          Err(e) => debug!("bridge poll failed: {}", e),
        }
      }
    })
  }

  /// Execute one drained request and deliver its single result
  async fn dispatch(&self, request: BridgeRequest) {
    let response = match self
      .handler
      .execute(&request.operation, request.params)
      .await
    {
      Ok(data) => BridgeResponse::ok(request.id, data),
      Err(e) => BridgeResponse::err(request.id, e.to_string()),
    };
    if let Err(e) = self.client.respond(&response).await {
      warn!(id = %response.id, "failed to deliver result: {}", e);
    }
  }

  /// Request the poll loop to stop
  pub fn shutdown(&self) {
    self.done.store(true, Ordering::Relaxed);
  }

  /// Check whether shutdown was requested
  pub fn is_done(&self) -> bool {
    self.done.load(Ordering::Relaxed)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  struct NullHandler;

  #[async_trait]
  impl OperationHandler for NullHandler {
    async fn execute(&self, _operation: &str, _params: Value) -> Result<Value> {
      Ok(Value::Null)
    }
  }

  #[test]
  fn test_executor_config_default() {
    let config = ExecutorConfig::default();
    assert_eq!(config.poll_interval, Duration::from_millis(1_000));
  }

  #[tokio::test]
  async fn test_executor_shutdown_flag() {
    let client = BridgeHttpClient::from_url("http://127.0.0.1:9");
    let executor = HostExecutor::new(client, Arc::new(NullHandler))
      .with_poll_interval(Duration::from_millis(10));
    assert!(!executor.is_done());
    executor.shutdown();
    assert!(executor.is_done());
  }
}
