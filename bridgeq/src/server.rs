//! HTTP transport for the bridge broker
//!
//! Exposes the correlation engine's four operations on a small axum
//! router reachable by both the caller's process and the host's process:
//!
//! - `GET /poll` drains the queue (host side)
//! - `POST /response` delivers a result (host side)
//! - `POST /queue` enqueues and awaits a result (caller side)
//! - `GET /health` reports broker state without mutating it
//!
//! CORS preflight is answered by the permissive CORS layer; the body-size
//! cap and JSON validation sit in front of the handlers, so malformed or
//! oversized payloads never reach the engine.

use crate::broker::Broker;
use crate::config::BridgeConfig;
use crate::error::{Error, Result};
use crate::message::{
  BridgeResponse, HealthResponse, PollResponse, QueueRequest, QueueResponse, ResponseAck,
};
use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared state for the transport handlers
struct AppState {
  broker: Arc<Broker>,
}

/// Bridge broker HTTP server
///
/// Owns a [`Broker`] and serves it over HTTP. Used three ways: as the
/// standalone server binary (`run`), embedded by the owner topology
/// (`serve_on` a listener the topology already bound), and on an ephemeral
/// port in tests.
pub struct BridgeServer {
  config: BridgeConfig,
  broker: Arc<Broker>,
}

impl BridgeServer {
  /// Create a new server with its own broker
  pub fn new(config: BridgeConfig) -> Self {
    let broker = Arc::new(Broker::new(config.clone()));
    Self { config, broker }
  }

  /// Create a new server around an existing broker
  pub fn with_broker(config: BridgeConfig, broker: Arc<Broker>) -> Self {
    Self { config, broker }
  }

  /// Get the broker instance
  pub fn broker(&self) -> Arc<Broker> {
    self.broker.clone()
  }

  /// Build the transport router
  pub fn router(&self) -> Router {
    let state = Arc::new(AppState {
      broker: self.broker.clone(),
    });
    Router::new()
      .route("/poll", get(poll_handler))
      .route("/response", post(response_handler))
      .route("/queue", post(queue_handler))
      .route("/health", get(health_handler))
      .fallback(not_found_handler)
      .layer(DefaultBodyLimit::max(self.config.max_body_bytes))
      .layer(CorsLayer::permissive())
      .layer(TraceLayer::new_for_http())
      .with_state(state)
  }

  /// Serve on an already-bound listener until the task is dropped
  pub async fn serve_on(self, listener: TcpListener) -> Result<()> {
    let app = self.router();
    axum::serve(listener, app).await.map_err(Error::Io)
  }

  /// Bind the configured address and run until interrupted
  ///
  /// On shutdown every outstanding waiter is rejected through
  /// [`Broker::shutdown`]; no caller is left suspended.
  pub async fn run(self) -> Result<()> {
    let addr = self.config.addr()?;
    let listener = TcpListener::bind(addr).await.map_err(Error::Io)?;
    info!("bridge broker listening on {}", addr);

    let broker = self.broker.clone();
    let app = self.router();
    let result = axum::serve(listener, app)
      .with_graceful_shutdown(async {
        let _ = tokio::signal::ctrl_c().await;
        info!("received shutdown signal, stopping broker...");
      })
      .await
      .map_err(Error::Io);

    broker.shutdown().await;
    result
  }
}

/// Drain the queue (host side)
async fn poll_handler(State(state): State<Arc<AppState>>) -> Json<PollResponse> {
  let requests = state.broker.drain().await;
  Json(PollResponse { requests })
}

/// Deliver a result (host side)
///
/// Always acknowledged: a result with no matching in-flight request is
/// discarded inside the engine, since the host has no way to retract an
/// answer it already committed to.
async fn response_handler(
  State(state): State<Arc<AppState>>,
  Json(response): Json<BridgeResponse>,
) -> Json<ResponseAck> {
  state.broker.deliver(response).await;
  Json(ResponseAck { success: true })
}

/// Enqueue an operation and await its result (caller side)
///
/// Blocks until resolved or timed out. Capacity, timeout, and host-reported
/// failures all come back in the uniform success/failure shape; the caller
/// never sees a raw error for a request the transport accepted.
async fn queue_handler(
  State(state): State<Arc<AppState>>,
  Json(body): Json<QueueRequest>,
) -> Json<QueueResponse> {
  let timeout = body.timeout_ms.map(Duration::from_millis);
  let result = state
    .broker
    .enqueue(&body.operation, body.params, timeout)
    .await;
  Json(QueueResponse::from_result(result))
}

/// Report broker state (never mutates)
async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
  Json(state.broker.health().await)
}

async fn not_found_handler() -> impl IntoResponse {
  (StatusCode::NOT_FOUND, Json(json!({"error": "Not found"})))
}
