// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

/// Errors surfaced by the packtrace client.
///
/// Ordinary remote failures never appear here; they come back as a
/// [`CallResult`](pt_core::CallResult) with an operation code.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("http client error: {0}")]
    Http(String),

    #[error("store error: {0}")]
    Store(#[from] pt_store::StoreError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("could not persist deferred request: {0}\n  hint: the request was neither sent nor stored")]
    DeferralFailed(String),

    #[error("fatal interchange error: {0}\n  hint: the deferred-request store may be inconsistent")]
    Interchange(String),

    #[error("reconciliation failed: {0}")]
    Reconciliation(String),

    #[error("reconciliation mismatch: {results} results but {packs} pending packs")]
    ReconciliationMismatch { results: usize, packs: usize },

    #[error("client already started")]
    AlreadyStarted,
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
