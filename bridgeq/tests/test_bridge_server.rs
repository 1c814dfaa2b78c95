//! End-to-end tests for the bridge HTTP surface
//!
//! These spin up a real server on an ephemeral port and drive it the way
//! callers and the polling host do.

use bridgeq::broker::Broker;
use bridgeq::{
  BridgeConfig, BridgeHttpClient, BridgeResponse, BridgeServer, Error, HostExecutor, OperationMux,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

async fn start_server(config: BridgeConfig) -> (Arc<Broker>, String) {
  let server = BridgeServer::new(config);
  let broker = server.broker();
  let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  tokio::spawn(server.serve_on(listener));
  (broker, format!("http://{addr}"))
}

fn test_config() -> BridgeConfig {
  BridgeConfig::new()
    .with_default_timeout(Duration::from_millis(2_000))
    .with_liveness_window(Duration::from_millis(200))
}

/// Poll over HTTP until the queue hands out requests
async fn poll_until_drained(host: &BridgeHttpClient) -> Vec<bridgeq::BridgeRequest> {
  for _ in 0..200 {
    let drained = host.poll().await.unwrap();
    if !drained.is_empty() {
      return drained;
    }
    tokio::time::sleep(Duration::from_millis(10)).await;
  }
  panic!("queue never produced a request");
}

#[tokio::test]
async fn test_enqueue_poll_respond_roundtrip() {
  let (_broker, url) = start_server(test_config()).await;
  let caller = BridgeHttpClient::from_url(url.clone());
  let host = BridgeHttpClient::from_url(url);

  let call = tokio::spawn(async move {
    caller
      .enqueue("echo", json!({"msg": "hi"}), Some(Duration::from_secs(2)))
      .await
  });

  let drained = poll_until_drained(&host).await;
  assert_eq!(drained.len(), 1);
  assert_eq!(drained[0].operation, "echo");
  assert_eq!(drained[0].params, json!({"msg": "hi"}));

  host
    .respond(&BridgeResponse::ok(drained[0].id.clone(), json!({"msg": "hi"})))
    .await
    .unwrap();

  assert_eq!(call.await.unwrap().unwrap(), json!({"msg": "hi"}));
}

#[tokio::test]
async fn test_timeout_without_host_names_operation() {
  let (_broker, url) = start_server(test_config()).await;
  let caller = BridgeHttpClient::from_url(url);

  let err = caller
    .enqueue("export", json!({}), Some(Duration::from_millis(100)))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Operation(_)));
  assert!(err.to_string().contains("export"));
  assert!(err.to_string().contains("timeout"));
}

#[tokio::test]
async fn test_health_liveness_transitions() {
  let (_broker, url) = start_server(test_config()).await;
  let client = BridgeHttpClient::from_url(url);

  // Before any poll the host is not live
  let health = client.health().await.unwrap();
  assert_eq!(health.status, "ok");
  assert!(!health.live);
  assert!(health.last_poll_at.is_none());

  // One poll makes it live
  client.poll().await.unwrap();
  let health = client.health().await.unwrap();
  assert!(health.live);
  assert!(health.last_poll_at.is_some());

  // Once the freshness window elapses it goes dead again
  tokio::time::sleep(Duration::from_millis(300)).await;
  let health = client.health().await.unwrap();
  assert!(!health.live);
}

#[tokio::test]
async fn test_stale_delivery_is_acknowledged_and_counted() {
  let (_broker, url) = start_server(test_config()).await;
  let client = BridgeHttpClient::from_url(url);

  // A delivery for an identifier that was never enqueued is discarded,
  // not an error: the ack still comes back
  client
    .respond(&BridgeResponse::ok("no-such-request", json!(1)))
    .await
    .unwrap();

  let health = client.health().await.unwrap();
  assert_eq!(health.discarded_responses, 1);
  assert_eq!(health.pending_requests, 0);
}

#[tokio::test]
async fn test_oversized_body_rejected_before_engine() {
  let (broker, url) = start_server(test_config().with_max_body_bytes(1024)).await;

  let huge = "x".repeat(4096);
  let status = reqwest::Client::new()
    .post(format!("{url}/queue"))
    .json(&json!({"operation": "create", "params": {"blob": huge}}))
    .send()
    .await
    .unwrap()
    .status();
  assert_eq!(status, reqwest::StatusCode::PAYLOAD_TOO_LARGE);

  // The rejected body never reached the engine
  let health = broker.health().await;
  assert_eq!(health.queued_requests, 0);
  assert_eq!(health.pending_requests, 0);
}

#[tokio::test]
async fn test_malformed_json_rejected_before_engine() {
  let (broker, url) = start_server(test_config()).await;

  let status = reqwest::Client::new()
    .post(format!("{url}/response"))
    .header("content-type", "application/json")
    .body("{not json")
    .send()
    .await
    .unwrap()
    .status();
  assert!(status.is_client_error());

  let health = broker.health().await;
  assert_eq!(health.discarded_responses, 0);
}

#[tokio::test]
async fn test_unknown_path_is_404() {
  let (_broker, url) = start_server(test_config()).await;
  let status = reqwest::Client::new()
    .get(format!("{url}/not-a-route"))
    .send()
    .await
    .unwrap()
    .status();
  assert_eq!(status, reqwest::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cors_preflight_is_approved() {
  let (_broker, url) = start_server(test_config()).await;
  let response = reqwest::Client::new()
    .request(reqwest::Method::OPTIONS, format!("{url}/queue"))
    .header("origin", "http://localhost:3000")
    .header("access-control-request-method", "POST")
    .send()
    .await
    .unwrap();
  assert!(response.status().is_success());
  assert!(response
    .headers()
    .contains_key("access-control-allow-origin"));
}

#[tokio::test]
async fn test_host_executor_end_to_end() {
  let (_broker, url) = start_server(test_config()).await;

  let mut mux = OperationMux::new();
  mux.handle_func("status", |_| Ok(json!({"connected": true})));
  mux.handle_async_func("echo", |params| async move { Ok(params) });

  let executor = Arc::new(
    HostExecutor::new(BridgeHttpClient::from_url(url.clone()), Arc::new(mux))
      .with_poll_interval(Duration::from_millis(20)),
  );
  let handle = executor.clone().start();

  let caller = BridgeHttpClient::from_url(url);
  let status = caller
    .enqueue("status", json!({}), Some(Duration::from_secs(2)))
    .await
    .unwrap();
  assert_eq!(status, json!({"connected": true}));

  let echoed = caller
    .enqueue("echo", json!({"n": 42}), Some(Duration::from_secs(2)))
    .await
    .unwrap();
  assert_eq!(echoed, json!({"n": 42}));

  // Unregistered operations come back as failures, not hangs
  let err = caller
    .enqueue("instantiate", json!({}), Some(Duration::from_secs(2)))
    .await
    .unwrap_err();
  assert!(err.to_string().contains("Unknown operation"));

  executor.shutdown();
  assert!(executor.is_done());
  let _ = tokio::time::timeout(Duration::from_secs(1), handle).await;
}

#[tokio::test]
async fn test_concurrent_callers_correlate_independently() {
  let (_broker, url) = start_server(test_config()).await;

  let mut mux = OperationMux::new();
  mux.handle_async_func("double", |params| async move {
    let n = params["n"].as_i64().unwrap_or(0);
    Ok(json!(n * 2))
  });
  let executor = Arc::new(
    HostExecutor::new(BridgeHttpClient::from_url(url.clone()), Arc::new(mux))
      .with_poll_interval(Duration::from_millis(20)),
  );
  let _handle = executor.clone().start();

  let mut calls = Vec::new();
  for n in 0..8 {
    let caller = BridgeHttpClient::from_url(url.clone());
    calls.push(tokio::spawn(async move {
      caller
        .enqueue("double", json!({"n": n}), Some(Duration::from_secs(2)))
        .await
    }));
  }
  for (n, call) in calls.into_iter().enumerate() {
    assert_eq!(call.await.unwrap().unwrap(), json!(n as i64 * 2));
  }
  executor.shutdown();
}
