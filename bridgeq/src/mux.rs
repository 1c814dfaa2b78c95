//! OperationMux - operation routing for the host executor
//!
//! Maps operation names to handlers. The broker never interprets
//! operations, so this is the seam where a host wires in its domain
//! behavior: register a handler per operation name, plus an optional
//! fallback for anything unlisted.

use crate::error::{Error, Result};
use crate::executor::OperationHandler;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;
type HandlerFunc = Arc<dyn Fn(Value) -> BoxFuture<Result<Value>> + Send + Sync>;

/// OperationMux - operation routing multiplexer
///
/// ```rust,no_run
/// use bridgeq::mux::OperationMux;
/// use serde_json::json;
///
/// let mut mux = OperationMux::new();
/// mux.handle_func("status", |_params| Ok(json!({"connected": true})));
/// mux.handle_async_func("echo", |params| async move { Ok(params) });
/// ```
#[derive(Default)]
pub struct OperationMux {
  handlers: HashMap<String, HandlerFunc>,
  fallback: Option<HandlerFunc>,
}

impl OperationMux {
  /// Create an empty mux
  pub fn new() -> Self {
    Self::default()
  }

  /// Register a synchronous handler for an operation name
  pub fn handle_func<F>(&mut self, operation: &str, handler: F)
  where
    F: Fn(Value) -> Result<Value> + Send + Sync + 'static,
  {
    let handler = Arc::new(handler);
    self.handlers.insert(
      operation.to_string(),
      Arc::new(move |params| {
        let handler = handler.clone();
        Box::pin(async move { handler(params) })
      }),
    );
  }

  /// Register an async handler for an operation name
  pub fn handle_async_func<F, Fut>(&mut self, operation: &str, handler: F)
  where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value>> + Send + 'static,
  {
    let handler = Arc::new(handler);
    self.handlers.insert(
      operation.to_string(),
      Arc::new(move |params| Box::pin(handler(params))),
    );
  }

  /// Register a fallback for operations with no named handler
  pub fn fallback_async_func<F, Fut>(&mut self, handler: F)
  where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value>> + Send + 'static,
  {
    let handler = Arc::new(handler);
    self.fallback = Some(Arc::new(move |params| Box::pin(handler(params))));
  }

  /// Number of registered named handlers
  pub fn len(&self) -> usize {
    self.handlers.len()
  }

  /// Whether no named handlers are registered
  pub fn is_empty(&self) -> bool {
    self.handlers.is_empty()
  }
}

#[async_trait]
impl OperationHandler for OperationMux {
  async fn execute(&self, operation: &str, params: Value) -> Result<Value> {
    match self.handlers.get(operation).or(self.fallback.as_ref()) {
      Some(handler) => handler(params).await,
      None => Err(Error::UnknownOperation(operation.to_string())),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[tokio::test]
  async fn test_sync_and_async_handlers() {
    let mut mux = OperationMux::new();
    mux.handle_func("status", |_| Ok(json!({"connected": true})));
    mux.handle_async_func("echo", |params| async move { Ok(params) });
    assert_eq!(mux.len(), 2);

    let status = mux.execute("status", Value::Null).await.unwrap();
    assert_eq!(status, json!({"connected": true}));

    let echoed = mux.execute("echo", json!({"msg": "hi"})).await.unwrap();
    assert_eq!(echoed, json!({"msg": "hi"}));
  }

  #[tokio::test]
  async fn test_unknown_operation() {
    let mux = OperationMux::new();
    let err = mux.execute("export", Value::Null).await.unwrap_err();
    assert!(matches!(err, Error::UnknownOperation(_)));
    assert_eq!(err.to_string(), "Unknown operation: export");
  }

  #[tokio::test]
  async fn test_fallback_catches_unlisted_operations() {
    let mut mux = OperationMux::new();
    mux.handle_func("status", |_| Ok(json!(1)));
    mux.fallback_async_func(|_| async move { Ok(json!("fallback")) });

    assert_eq!(mux.execute("status", Value::Null).await.unwrap(), json!(1));
    assert_eq!(
      mux.execute("anything", Value::Null).await.unwrap(),
      json!("fallback")
    );
  }

  #[tokio::test]
  async fn test_handler_error_propagates() {
    let mut mux = OperationMux::new();
    mux.handle_func("delete", |_| Err(Error::operation("node not found")));
    let err = mux.execute("delete", Value::Null).await.unwrap_err();
    assert_eq!(err.to_string(), "node not found");
  }
}
