//! # bridgeq
//!
//! A local bridge broker between external callers and a sandboxed polling
//! host.
//!
//! ## Overview
//!
//! Some host processes (a design-tool plugin sandbox, an embedded
//! scripting runtime) cannot accept connections or receive callbacks; the
//! only way out is to repeatedly poll a local endpoint. `bridgeq` turns
//! that one-directional-poll constraint into a reliable, ordered,
//! timeout-bounded request/response channel: any number of callers
//! enqueue operations and await results, exactly one host drains the
//! queue by polling and posts results back, and the broker correlates
//! every result to the caller still waiting on it.
//!
//! Operation names and payloads are opaque to the broker; it never
//! interprets them.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐  POST /queue   ┌──────────────────────┐   GET /poll   ┌──────────────┐
//! │   Caller 1   │ ─────────────▶ │                      │ ◀───────────  │              │
//! └──────────────┘                │    bridge broker     │               │ polling host │
//! ┌──────────────┐  POST /queue   │  queue + in-flight   │ POST /response│  (sandboxed) │
//! │   Caller 2   │ ─────────────▶ │     correlation      │ ◀───────────  │              │
//! └──────────────┘                └──────────────────────┘               └──────────────┘
//! ```
//!
//! Exactly one process on a machine owns the shared port; every other
//! process delegates to it over HTTP. The [`topology::Topology`] selector
//! makes that choice once at startup by attempting the bind.
//!
//! ## Enqueue-and-await
//!
//! ```rust,no_run
//! use bridgeq::{BridgeConfig, Topology};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> bridgeq::Result<()> {
//!     let topology = Topology::select(BridgeConfig::from_env()?).await?;
//!     let result = topology
//!         .call("create", json!({"type": "frame", "name": "Hero"}), None)
//!         .await?;
//!     println!("{result}");
//!     Ok(())
//! }
//! ```
//!
//! ## Host side
//!
//! ```rust,no_run
//! use bridgeq::{BridgeConfig, BridgeHttpClient, HostExecutor, OperationMux};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # async fn example() {
//! let mut mux = OperationMux::new();
//! mux.handle_func("status", |_params| Ok(json!({"connected": true})));
//!
//! let client = BridgeHttpClient::new(&BridgeConfig::default());
//! let executor = Arc::new(HostExecutor::new(client, Arc::new(mux)));
//! let handle = executor.clone().start();
//! # }
//! ```

pub mod broker;
pub mod client;
pub mod config;
pub mod error;
pub mod executor;
pub mod message;
pub mod mux;
pub mod server;
pub mod topology;

pub use broker::Broker;
pub use client::BridgeHttpClient;
pub use config::BridgeConfig;
pub use error::{Error, Result};
pub use executor::{ExecutorConfig, HostExecutor, OperationHandler};
pub use message::{BridgeRequest, BridgeResponse, HealthResponse, PollResponse, QueueRequest, QueueResponse};
pub use mux::OperationMux;
pub use server::BridgeServer;
pub use topology::{Role, Topology};
