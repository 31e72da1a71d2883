// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Structured results returned for every call.
//!
//! Callers always receive a populated result, even when the remote system
//! was never reached; the operation code tells them what happened.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::bulk::PackOutcome;
use crate::codes;
use crate::state::PackState;

/// Result of a single-pack operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackResult {
    #[serde(default)]
    pub operation_code: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<PackState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub information: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    /// Unique pack return code: an authoritative alert identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uprc: Option<String>,
}

impl PackResult {
    /// A failure carrying the given operation code and warning text.
    pub fn failure(operation_code: i32, warning: impl Into<String>) -> Self {
        PackResult {
            operation_code,
            warning: Some(warning.into()),
            ..Default::default()
        }
    }

    pub fn is_success(&self) -> bool {
        self.operation_code == codes::SUCCESS
    }
}

/// Severity derived from a pack result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Success = 0,
    SuccessWithWarning = 1,
    Failure = 2,
    FailureWithAlert = 3,
}

impl Severity {
    /// Classifies a result: failures carrying a UPRC rank highest.
    pub fn of(result: &PackResult) -> Severity {
        match (result.is_success(), result.warning.is_some(), result.uprc.is_some()) {
            (true, false, _) => Severity::Success,
            (true, true, _) => Severity::SuccessWithWarning,
            (false, _, false) => Severity::Failure,
            (false, _, true) => Severity::FailureWithAlert,
        }
    }

    pub fn as_u8(&self) -> u8 {
        *self as u8
    }

    pub fn from_u8(value: u8) -> Option<Severity> {
        match value {
            0 => Some(Severity::Success),
            1 => Some(Severity::SuccessWithWarning),
            2 => Some(Severity::Failure),
            3 => Some(Severity::FailureWithAlert),
            _ => None,
        }
    }
}

/// The outcome of one logical call through the client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallResult {
    /// HTTP status of the response the result was built from, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    pub result: PackResult,
    /// Where asynchronous results can be fetched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// When asynchronous results are expected to be ready.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eta: Option<DateTime<Utc>>,
    /// When asynchronous results stop being available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
    /// Per-pack results of a bulk or recovery request.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub packs: Vec<PackOutcome>,
}

impl CallResult {
    /// A result synthesized locally, without a remote response.
    pub fn local(operation_code: i32, warning: impl Into<String>) -> Self {
        CallResult {
            result: PackResult::failure(operation_code, warning),
            ..Default::default()
        }
    }

    pub fn operation_code(&self) -> i32 {
        self.result.operation_code
    }

    pub fn is_success(&self) -> bool {
        self.result.is_success()
    }
}

#[cfg(test)]
#[path = "result_tests.rs"]
mod tests;
