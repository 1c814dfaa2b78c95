//! Topology selection: broker owner or delegate
//!
//! Exactly one process on a machine can hold the shared bridge port. At
//! startup each process attempts the bind once and branches on the
//! outcome:
//!
//! - the bind succeeds → this process **owns** the broker; its enqueues go
//!   to the local engine and every other process reaches it over HTTP
//! - the bind fails with address-in-use → a broker already exists; this
//!   process is a **delegate** and forwards enqueues to it
//!
//! The bind failure itself is the mutual-exclusion signal. Probing
//! `/health` first would race with the bind, so it is never done.
//!
//! A delegate whose broker dies between selection and a call gets exactly
//! one automatic recovery: transiently become the broker for the duration
//! of that single call, then shut the transient broker down. This covers
//! one-shot invocations with no persistent process guaranteed to be
//! listening.

use crate::broker::Broker;
use crate::client::BridgeHttpClient;
use crate::config::BridgeConfig;
use crate::error::{Error, Result};
use crate::server::BridgeServer;
use serde_json::Value;
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Which side of the shared port this process ended up on
pub enum Role {
  /// This process holds the port and runs the engine locally
  Owner {
    broker: Arc<Broker>,
    addr: SocketAddr,
    server: JoinHandle<()>,
  },
  /// Another process holds the port; calls are forwarded over HTTP
  Delegate { client: BridgeHttpClient },
}

/// Per-process bridge topology
pub struct Topology {
  config: BridgeConfig,
  role: Role,
}

impl Topology {
  /// Select the topology for this process by attempting the bind once
  pub async fn select(config: BridgeConfig) -> Result<Self> {
    let addr = config.addr()?;
    match TcpListener::bind(addr).await {
      Ok(listener) => {
        let addr = listener.local_addr().map_err(Error::Io)?;
        let server = BridgeServer::new(config.clone());
        let broker = server.broker();
        let handle = tokio::spawn(async move {
          if let Err(e) = server.serve_on(listener).await {
            error!("bridge server stopped: {}", e);
          }
        });
        info!("bridge topology: owner on {}", addr);
        Ok(Self {
          config,
          role: Role::Owner {
            broker,
            addr,
            server: handle,
          },
        })
      }
      Err(e) if e.kind() == ErrorKind::AddrInUse => {
        debug!("bridge port taken, delegating to the broker on {}", addr);
        Ok(Self::delegate_to(config))
      }
      Err(e) => Err(Error::Io(e)),
    }
  }

  /// Build a delegate topology without attempting the bind
  pub fn delegate_to(config: BridgeConfig) -> Self {
    let client = BridgeHttpClient::new(&config);
    Self {
      config,
      role: Role::Delegate { client },
    }
  }

  /// Get the selected role
  pub fn role(&self) -> &Role {
    &self.role
  }

  /// Whether this process owns the broker
  pub fn is_owner(&self) -> bool {
    matches!(self.role, Role::Owner { .. })
  }

  /// The local broker, when this process owns it
  pub fn broker(&self) -> Option<Arc<Broker>> {
    match &self.role {
      Role::Owner { broker, .. } => Some(broker.clone()),
      Role::Delegate { .. } => None,
    }
  }

  /// The bound address, when this process owns the broker
  pub fn local_addr(&self) -> Option<SocketAddr> {
    match &self.role {
      Role::Owner { addr, .. } => Some(*addr),
      Role::Delegate { .. } => None,
    }
  }

  /// Enqueue an operation through whichever side of the port we hold
  pub async fn call(
    &self,
    operation: &str,
    params: Value,
    timeout: Option<Duration>,
  ) -> Result<Value> {
    match &self.role {
      Role::Owner { broker, .. } => broker.enqueue(operation, params, timeout).await,
      Role::Delegate { client } => match client.enqueue(operation, params.clone(), timeout).await {
        // A status rejection means a broker answered; only failures to
        // reach one at all trigger the transient fallback
        Err(Error::Transport(e)) if !e.is_status() => {
          self.transient_call(operation, params, timeout).await
        }
        other => other,
      },
    }
  }

  /// One-shot fallback: own the broker for the duration of a single call
  async fn transient_call(
    &self,
    operation: &str,
    params: Value,
    timeout: Option<Duration>,
  ) -> Result<Value> {
    warn!("bridge broker unreachable, serving this call from a transient broker");
    let addr = self.config.addr()?;
    let listener = TcpListener::bind(addr).await.map_err(Error::Io)?;
    let server = BridgeServer::new(self.config.clone());
    let broker = server.broker();
    let handle = tokio::spawn(async move {
      let _ = server.serve_on(listener).await;
    });

    let result = broker.enqueue(operation, params, timeout).await;

    broker.shutdown().await;
    handle.abort();
    result
  }

  /// Tear down whatever this process holds
  ///
  /// Owners reject all outstanding work and release the port; delegates
  /// hold nothing.
  pub async fn shutdown(&self) {
    if let Role::Owner { broker, server, .. } = &self.role {
      broker.shutdown().await;
      server.abort();
    }
  }
}
