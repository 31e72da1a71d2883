// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for pt-core operations.

use thiserror::Error;

/// All possible errors that can occur in pt-core operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid pack state: '{0}'\n  hint: valid states are: Active, Supplied, Destroyed, Exported, Stolen, Sample, FreeSample, Locked, CheckedOut, Expired, Recalled, Withdrawn")]
    InvalidPackState(String),

    #[error("invalid product code scheme: '{0}'\n  hint: valid schemes are: gtin, ppn")]
    InvalidScheme(String),

    #[error("invalid verb: '{0}'\n  hint: valid verbs are: GET, POST, PATCH")]
    InvalidVerb(String),

    #[error("invalid request type: '{0}'")]
    InvalidRequestType(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for pt-core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
