//! Bridge broker: the request/response correlation engine
//!
//! The broker owns the queue of requests the host has not yet drained and
//! the map of in-flight requests still awaiting a result. Callers enqueue
//! and suspend; the host drains the queue by polling and later delivers a
//! result carrying the request identifier, which resolves the matching
//! waiter. Timers bound every wait, so an accepted enqueue always settles
//! exactly once even if the host never polls or never answers.
//!
//! Per-request lifecycle:
//!
//! ```text
//! accepted → queued → drained → { resolved
//!                               | rejected-by-timeout
//!                               | rejected-by-shutdown }
//! ```
//!
//! All state lives in one instance behind a single lock; the lock is never
//! held across a suspension point. One process can run several brokers,
//! which is what the tests do.

use crate::config::BridgeConfig;
use crate::error::{Error, Result};
use crate::message::{BridgeRequest, BridgeResponse, HealthResponse};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::sync::{oneshot, Mutex};
use tokio::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

/// Bookkeeping for one in-flight request
struct PendingEntry {
  /// Operation name, kept for timeout diagnostics
  operation: String,
  /// Resolves the caller still awaiting this request's result
  reply_tx: oneshot::Sender<BridgeResponse>,
}

#[derive(Default)]
struct BrokerState {
  /// Requests accepted but not yet drained, in acceptance order
  queue: VecDeque<BridgeRequest>,
  /// In-flight requests awaiting a result, keyed by identifier
  pending: HashMap<String, PendingEntry>,
  /// Liveness bookkeeping; wall timestamps for reporting, the monotonic
  /// instant for the freshness comparison
  last_poll_at: Option<DateTime<Utc>>,
  last_poll_instant: Option<Instant>,
  last_response_at: Option<DateTime<Utc>>,
  last_request_at: Option<DateTime<Utc>>,
  /// Deliveries with no matching in-flight request
  discarded_responses: u64,
  stopped: bool,
}

/// The bridge broker
///
/// An explicit instance with owned state and an explicit lifecycle: create
/// with [`Broker::new`], tear down with [`Broker::shutdown`]. Every caller
/// holds it behind an `Arc`.
pub struct Broker {
  config: BridgeConfig,
  state: Mutex<BrokerState>,
}

impl Broker {
  /// Create a new broker
  pub fn new(config: BridgeConfig) -> Self {
    Self {
      config,
      state: Mutex::new(BrokerState::default()),
    }
  }

  /// Get the broker configuration
  pub fn config(&self) -> &BridgeConfig {
    &self.config
  }

  /// Enqueue an operation and await its result
  ///
  /// Fails fast with a capacity error once the queue-depth or in-flight cap
  /// is reached; an unbounded queue in front of a possibly-dead host is
  /// worse than an explicit rejection. On acceptance the call suspends
  /// until the host delivers a result, the effective timeout elapses, or
  /// the broker is shut down; exactly one of those settles it.
  pub async fn enqueue(
    &self,
    operation: &str,
    params: Value,
    timeout: Option<Duration>,
  ) -> Result<Value> {
    let timeout = timeout.unwrap_or(self.config.default_timeout);

    let (id, reply_rx) = {
      let mut state = self.state.lock().await;
      if state.stopped {
        return Err(Error::Stopped);
      }
      if state.queue.len() >= self.config.max_queue {
        return Err(Error::Capacity {
          resource: "queue",
          limit: self.config.max_queue,
        });
      }
      if state.pending.len() >= self.config.max_pending {
        return Err(Error::Capacity {
          resource: "pending",
          limit: self.config.max_pending,
        });
      }

      let request = BridgeRequest {
        id: Uuid::new_v4().to_string(),
        operation: operation.to_string(),
        params,
      };
      let id = request.id.clone();
      let (reply_tx, reply_rx) = oneshot::channel();
      state.pending.insert(
        id.clone(),
        PendingEntry {
          operation: operation.to_string(),
          reply_tx,
        },
      );
      state.queue.push_back(request);
      state.last_request_at = Some(Utc::now());
      (id, reply_rx)
    };

    match tokio::time::timeout(timeout, reply_rx).await {
      Ok(Ok(response)) => {
        if response.success {
          Ok(response.data.unwrap_or(Value::Null))
        } else {
          Err(Error::operation(
            response.error.unwrap_or_else(|| "Unknown error".to_string()),
          ))
        }
      }
      // Sender dropped without a send: shutdown cleared the in-flight map
      Ok(Err(_)) => Err(Error::Stopped),
      Err(_) => {
        let mut state = self.state.lock().await;
        if state.pending.remove(&id).is_some() {
          debug!(id = %id, operation = %operation, "request timed out");
        }
        Err(Error::Timeout {
          operation: operation.to_string(),
        })
      }
    }
  }

  /// Atomically take every queued request, in acceptance order
  ///
  /// Called by the host side on its poll cadence. Draining an empty queue
  /// returns an empty vec, never an error. Updates the last-poll timestamp
  /// the liveness heuristic is derived from.
  pub async fn drain(&self) -> Vec<BridgeRequest> {
    let mut state = self.state.lock().await;
    state.last_poll_at = Some(Utc::now());
    state.last_poll_instant = Some(Instant::now());
    state.queue.drain(..).collect()
  }

  /// Deliver a result for a previously drained request
  ///
  /// Resolves the matching waiter if one is still in flight. A result with
  /// no matching in-flight request (already timed out, duplicate, or never
  /// enqueued here) is logged and discarded; the host cannot retract a
  /// committed answer, so this is never an error.
  pub async fn deliver(&self, response: BridgeResponse) {
    let mut state = self.state.lock().await;
    state.last_response_at = Some(Utc::now());
    match state.pending.remove(&response.id) {
      Some(entry) => {
        if entry.reply_tx.send(response).is_err() {
          // The waiter went away without settling; treat like a late reply
          state.discarded_responses += 1;
          debug!(operation = %entry.operation, "caller gone before delivery");
        }
      }
      None => {
        state.discarded_responses += 1;
        warn!(id = %response.id, "no pending request for response");
      }
    }
  }

  /// Report broker state without mutating any of it
  ///
  /// `live` is a heuristic: the host counts as live only if it drained the
  /// queue within the configured freshness window. A host can drain and
  /// then hang before executing, so this is not a guarantee.
  pub async fn health(&self) -> HealthResponse {
    let state = self.state.lock().await;
    let live = state
      .last_poll_instant
      .map(|t| t.elapsed() <= self.config.liveness_window)
      .unwrap_or(false);
    HealthResponse {
      status: "ok".to_string(),
      live,
      pending_requests: state.pending.len(),
      queued_requests: state.queue.len(),
      discarded_responses: state.discarded_responses,
      last_poll_at: state.last_poll_at,
      last_response_at: state.last_response_at,
      last_request_at: state.last_request_at,
    }
  }

  /// Stop the broker
  ///
  /// Clears the queue and rejects every outstanding waiter with a
  /// broker-stopped error; no request is dropped without its caller being
  /// notified. Safe to call repeatedly and with zero outstanding work.
  /// Subsequent enqueues fail with the stopped error.
  pub async fn shutdown(&self) {
    let mut state = self.state.lock().await;
    if state.stopped {
      return;
    }
    state.stopped = true;
    let queued = state.queue.len();
    let pending = state.pending.len();
    state.queue.clear();
    // Dropping the reply senders rejects every waiter with Error::Stopped
    state.pending.clear();
    if queued > 0 || pending > 0 {
      debug!(queued, pending, "broker stopped with outstanding work");
    }
  }

  /// Check whether the broker has been stopped
  pub async fn is_stopped(&self) -> bool {
    self.state.lock().await.stopped
  }
}
