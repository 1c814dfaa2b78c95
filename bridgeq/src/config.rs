//! Bridge configuration
//!
//! All limits and addresses are process-wide constants resolved once at
//! startup; there is no runtime reconfiguration.

use crate::error::{Error, Result};
use std::net::{SocketAddr, ToSocketAddrs};
use std::time::Duration;

/// Default bind host
pub const DEFAULT_HOST: &str = "127.0.0.1";
/// Default bind port, shared by every process on the machine
pub const DEFAULT_PORT: u16 = 38451;
/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(10_000);
/// How recently the host must have polled to count as live
pub const DEFAULT_LIVENESS_WINDOW: Duration = Duration::from_millis(15_000);
/// Maximum number of undrained requests
pub const DEFAULT_MAX_QUEUE: usize = 100;
/// Maximum number of in-flight requests awaiting a result
pub const DEFAULT_MAX_PENDING: usize = 100;
/// Maximum accepted request body size in bytes
pub const DEFAULT_MAX_BODY_BYTES: usize = 1_000_000;

/// Bridge configuration
#[derive(Debug, Clone)]
pub struct BridgeConfig {
  /// Bind host
  pub host: String,
  /// Bind port
  pub port: u16,
  /// Per-request timeout applied when the caller does not give one
  pub default_timeout: Duration,
  /// Freshness window for the host liveness heuristic
  pub liveness_window: Duration,
  /// Queue depth cap; enqueue fails fast once reached
  pub max_queue: usize,
  /// In-flight cap, distinct from queue depth since drained-but-unresolved
  /// requests consume a different resource
  pub max_pending: usize,
  /// Request body size cap enforced at the transport boundary
  pub max_body_bytes: usize,
}

impl Default for BridgeConfig {
  fn default() -> Self {
    Self {
      host: DEFAULT_HOST.to_string(),
      port: DEFAULT_PORT,
      default_timeout: DEFAULT_TIMEOUT,
      liveness_window: DEFAULT_LIVENESS_WINDOW,
      max_queue: DEFAULT_MAX_QUEUE,
      max_pending: DEFAULT_MAX_PENDING,
      max_body_bytes: DEFAULT_MAX_BODY_BYTES,
    }
  }
}

impl BridgeConfig {
  /// Create a new configuration with the default constants
  pub fn new() -> Self {
    Self::default()
  }

  /// Set the bind host
  pub fn with_host<S: Into<String>>(mut self, host: S) -> Self {
    self.host = host.into();
    self
  }

  /// Set the bind port
  pub fn with_port(mut self, port: u16) -> Self {
    self.port = port;
    self
  }

  /// Set the default per-request timeout
  pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
    self.default_timeout = timeout;
    self
  }

  /// Set the liveness freshness window
  pub fn with_liveness_window(mut self, window: Duration) -> Self {
    self.liveness_window = window;
    self
  }

  /// Set the queue depth cap
  pub fn with_max_queue(mut self, max_queue: usize) -> Self {
    self.max_queue = max_queue;
    self
  }

  /// Set the in-flight cap
  pub fn with_max_pending(mut self, max_pending: usize) -> Self {
    self.max_pending = max_pending;
    self
  }

  /// Set the request body size cap
  pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
    self.max_body_bytes = max_body_bytes;
    self
  }

  /// Build a configuration from `BRIDGEQ_*` environment variables,
  /// falling back to the defaults for anything unset
  pub fn from_env() -> Result<Self> {
    let mut config = Self::default();
    if let Ok(host) = std::env::var("BRIDGEQ_HOST") {
      config.host = host;
    }
    if let Ok(port) = std::env::var("BRIDGEQ_PORT") {
      config.port = port
        .parse()
        .map_err(|_| Error::config(format!("Invalid BRIDGEQ_PORT: {port}")))?;
    }
    if let Ok(ms) = std::env::var("BRIDGEQ_TIMEOUT_MS") {
      config.default_timeout = Duration::from_millis(
        ms.parse()
          .map_err(|_| Error::config(format!("Invalid BRIDGEQ_TIMEOUT_MS: {ms}")))?,
      );
    }
    if let Ok(ms) = std::env::var("BRIDGEQ_LIVENESS_WINDOW_MS") {
      config.liveness_window = Duration::from_millis(
        ms.parse()
          .map_err(|_| Error::config(format!("Invalid BRIDGEQ_LIVENESS_WINDOW_MS: {ms}")))?,
      );
    }
    if let Ok(n) = std::env::var("BRIDGEQ_MAX_QUEUE") {
      config.max_queue = n
        .parse()
        .map_err(|_| Error::config(format!("Invalid BRIDGEQ_MAX_QUEUE: {n}")))?;
    }
    if let Ok(n) = std::env::var("BRIDGEQ_MAX_PENDING") {
      config.max_pending = n
        .parse()
        .map_err(|_| Error::config(format!("Invalid BRIDGEQ_MAX_PENDING: {n}")))?;
    }
    if let Ok(n) = std::env::var("BRIDGEQ_MAX_BODY_BYTES") {
      config.max_body_bytes = n
        .parse()
        .map_err(|_| Error::config(format!("Invalid BRIDGEQ_MAX_BODY_BYTES: {n}")))?;
    }
    Ok(config)
  }

  /// Resolve the configured bind address
  pub fn addr(&self) -> Result<SocketAddr> {
    (self.host.as_str(), self.port)
      .to_socket_addrs()
      .map_err(Error::Io)?
      .next()
      .ok_or_else(|| Error::config(format!("Cannot resolve bind address: {}:{}", self.host, self.port)))
  }

  /// Base URL of a broker reachable at this configuration
  pub fn base_url(&self) -> String {
    format!("http://{}:{}", self.host, self.port)
  }
}
