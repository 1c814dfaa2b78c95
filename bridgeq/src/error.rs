//! Error types for bridgeq

use thiserror::Error;

/// Result type for bridgeq
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for bridgeq
#[derive(Error, Debug)]
pub enum Error {
  /// A resource cap was hit at enqueue time; the caller must retry or
  /// surface the failure, the broker never queues beyond its caps
  #[error("{resource} capacity exceeded (limit: {limit})")]
  Capacity {
    resource: &'static str,
    limit: usize,
  },

  /// No result arrived within the effective timeout window
  #[error("Request timeout: {operation}")]
  Timeout { operation: String },

  /// The broker was stopped while the request was outstanding
  #[error("Bridge stopped")]
  Stopped,

  /// Failure reported by the bridge or the host for an executed operation
  #[error("{0}")]
  Operation(String),

  /// No handler is registered for the operation name
  #[error("Unknown operation: {0}")]
  UnknownOperation(String),

  /// Network failure reaching a remote broker
  #[error("Transport error: {0}")]
  Transport(#[from] reqwest::Error),

  /// Invalid message
  #[error("Invalid message: {0}")]
  InvalidMessage(String),

  /// Serialization error
  #[error("Serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  /// IO error
  #[error("IO error: {0}")]
  Io(#[from] std::io::Error),

  /// Configuration error
  #[error("Configuration error: {message}")]
  Config { message: String },
}

impl Error {
  /// Create an operation failure error
  pub fn operation<S: Into<String>>(msg: S) -> Self {
    Self::Operation(msg.into())
  }

  /// Create an invalid message error
  pub fn invalid_message<S: Into<String>>(msg: S) -> Self {
    Self::InvalidMessage(msg.into())
  }

  /// Create a configuration error
  pub fn config<S: Into<String>>(msg: S) -> Self {
    Self::Config {
      message: msg.into(),
    }
  }

  /// Check whether this is a timeout error
  pub fn is_timeout(&self) -> bool {
    matches!(self, Error::Timeout { .. })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_error_creation() {
    let err = Error::operation("host rejected the node id");
    assert!(matches!(err, Error::Operation(_)));

    let err = Error::invalid_message("not a bridge response");
    assert!(matches!(err, Error::InvalidMessage(_)));

    let err = Error::config("bad port");
    assert!(matches!(err, Error::Config { .. }));
  }

  #[test]
  fn test_timeout_message_names_operation() {
    let err = Error::Timeout {
      operation: "create".to_string(),
    };
    assert!(err.is_timeout());
    assert_eq!(err.to_string(), "Request timeout: create");
  }

  #[test]
  fn test_capacity_message() {
    let err = Error::Capacity {
      resource: "queue",
      limit: 100,
    };
    assert_eq!(err.to_string(), "queue capacity exceeded (limit: 100)");
  }
}
