//! Wire types for the bridge protocol
//!
//! This module defines the JSON message shapes exchanged between callers,
//! the broker, and the polling host. Operation names and parameter payloads
//! are opaque to the broker; it only ever inspects the request identifier
//! and the success flag.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A request queued for the host
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeRequest {
  /// Unique request identifier, generated at enqueue time
  pub id: String,
  /// Operation name, opaque to the broker
  pub operation: String,
  /// Operation parameters, opaque to the broker
  #[serde(default)]
  pub params: Value,
}

/// A result delivered by the host for a previously drained request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeResponse {
  /// Identifier of the request this result answers
  pub id: String,
  /// Whether the operation succeeded on the host
  pub success: bool,
  /// Result payload on success
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub data: Option<Value>,
  /// Error message on failure
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
}

impl BridgeResponse {
  /// Create a success response
  pub fn ok<S: Into<String>>(id: S, data: Value) -> Self {
    Self {
      id: id.into(),
      success: true,
      data: Some(data),
      error: None,
    }
  }

  /// Create a failure response
  pub fn err<S: Into<String>, E: Into<String>>(id: S, error: E) -> Self {
    Self {
      id: id.into(),
      success: false,
      data: None,
      error: Some(error.into()),
    }
  }
}

/// Body of `POST /queue`: enqueue an operation and await its result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueRequest {
  /// Operation name
  pub operation: String,
  /// Operation parameters
  #[serde(default)]
  pub params: Value,
  /// Caller-specified timeout in milliseconds; the broker default applies
  /// when absent
  #[serde(default, rename = "timeout", skip_serializing_if = "Option::is_none")]
  pub timeout_ms: Option<u64>,
}

/// Response of `POST /queue`: the uniform success/failure result shape
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueResponse {
  /// Whether the call produced a result
  pub success: bool,
  /// Result payload on success
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub data: Option<Value>,
  /// Error message on failure
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
}

impl QueueResponse {
  /// Convert an enqueue outcome into the wire shape
  pub fn from_result(result: Result<Value>) -> Self {
    match result {
      Ok(data) => Self {
        success: true,
        data: Some(data),
        error: None,
      },
      Err(e) => Self {
        success: false,
        data: None,
        error: Some(e.to_string()),
      },
    }
  }

  /// Convert the wire shape back into an enqueue outcome
  pub fn into_result(self) -> Result<Value> {
    if self.success {
      Ok(self.data.unwrap_or(Value::Null))
    } else {
      Err(Error::operation(
        self.error.unwrap_or_else(|| "Unknown error".to_string()),
      ))
    }
  }
}

/// Response of `GET /poll`: everything drained from the queue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollResponse {
  /// Drained requests in acceptance order
  pub requests: Vec<BridgeRequest>,
}

/// Response of `POST /response`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseAck {
  pub success: bool,
}

/// Response of `GET /health`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
  /// Always "ok" while the broker is reachable
  pub status: String,
  /// Whether the host polled within the liveness window
  pub live: bool,
  /// Number of in-flight requests awaiting a result
  pub pending_requests: usize,
  /// Number of undrained requests
  pub queued_requests: usize,
  /// Number of deliveries discarded for lack of a matching in-flight request
  pub discarded_responses: u64,
  /// Timestamp of the most recent successful drain
  #[serde(skip_serializing_if = "Option::is_none")]
  pub last_poll_at: Option<DateTime<Utc>>,
  /// Timestamp of the most recent delivered result
  #[serde(skip_serializing_if = "Option::is_none")]
  pub last_response_at: Option<DateTime<Utc>>,
  /// Timestamp of the most recent accepted request
  #[serde(skip_serializing_if = "Option::is_none")]
  pub last_request_at: Option<DateTime<Utc>>,
}
