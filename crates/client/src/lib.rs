// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! packtrace: a resilient client for a national pack track-and-trace system.
//!
//! Single-pack verbs (verify, supply, decommission, reactivate), bulk
//! requests and recovery requests go through one execution engine that
//! validates locally, retries by failure class and never loses a state
//! change: calls that cannot reach the remote are deferred into a
//! [`Store`](pt_store::Store) and later replayed by a background recovery
//! coordinator, which pairs the authoritative results with the deferred
//! requests oldest first.
//!
//! ```no_run
//! # async fn demo() -> packtrace::Result<()> {
//! use std::sync::Arc;
//! use packtrace::{Client, ClientConfig, MemoryStore, Pack, PackState};
//!
//! let config = ClientConfig::new("https://nmvs.example/api/v1");
//! let client = Client::builder(config)
//!     .store(Arc::new(MemoryStore::new()))
//!     .build()?;
//! client.start()?;
//! let pack = Pack::new("05012345678900", "SN1", "B1", "261231");
//! let result = client.decommission(pack, PackState::Destroyed).await?;
//! println!("operation code {}", result.operation_code());
//! client.close().await;
//! # Ok(())
//! # }
//! ```

pub mod cache;
mod client;
pub mod config;
mod deferral;
pub mod endpoints;
mod engine;
mod error;
pub mod events;
pub mod headers;
pub mod http;
pub mod log;
mod mode;
mod outbound;
mod recovery;
mod response;
pub mod token;

#[cfg(test)]
mod test_helpers;

pub use client::{Client, ClientBuilder};
pub use config::{AuthConfig, ClientConfig, StoreAndForwardMode};
pub use error::{Error, Result};
pub use events::{DeferringRequest, ModeChanged, Statistics};
pub use http::{HttpError, HttpExecutor, HttpRequest, HttpResponse, HttpResult, ReqwestExecutor};
pub use log::{init_tracing, LogCategory, LogEntry, LogSeverity, LogSink, TracingSink};
pub use token::{OAuthTokenProvider, Token, TokenProvider};

pub use pt_core::{
    codes, BulkRequest, CallResult, DeferredRequest, Pack, PackCommand, PackOutcome, PackResult,
    PackState, ProductCodeScheme, RecoveryRequest, RecoverySinglePackResponse, Registry,
    RequestType, Severity, Verb,
};
pub use pt_store::{MemoryStore, SqliteStore, Store, StoreError, Transaction};
