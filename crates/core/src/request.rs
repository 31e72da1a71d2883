// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Request kinds and the records kept by store-and-forward.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::bulk::PackOutcome;
use crate::error::{Error, Result};
use crate::pack::Pack;
use crate::result::{PackResult, Severity};
use crate::state::PackState;

/// HTTP verb of an outbound call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verb {
    Get,
    Post,
    Patch,
}

impl Verb {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Get => "GET",
            Verb::Post => "POST",
            Verb::Patch => "PATCH",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Verb {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "GET" => Ok(Verb::Get),
            "POST" => Ok(Verb::Post),
            "PATCH" => Ok(Verb::Patch),
            _ => Err(Error::InvalidVerb(s.to_string())),
        }
    }
}

/// The kind of call being executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestType {
    VerifyPack,
    SupplyPack,
    DecommissionPack,
    ReactivatePack,
    SubmitBulkRequest,
    GetBulkResult,
    SubmitRecoveryRequest,
    GetRecoveryResult,
}

impl RequestType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestType::VerifyPack => "verify_pack",
            RequestType::SupplyPack => "supply_pack",
            RequestType::DecommissionPack => "decommission_pack",
            RequestType::ReactivatePack => "reactivate_pack",
            RequestType::SubmitBulkRequest => "submit_bulk_request",
            RequestType::GetBulkResult => "get_bulk_result",
            RequestType::SubmitRecoveryRequest => "submit_recovery_request",
            RequestType::GetRecoveryResult => "get_recovery_result",
        }
    }

    /// Returns true if a failed call of this type may be stored for later
    /// resubmission. Recovery traffic and result polling never are.
    pub fn is_deferrable(&self) -> bool {
        !matches!(
            self,
            RequestType::SubmitRecoveryRequest
                | RequestType::GetBulkResult
                | RequestType::GetRecoveryResult
        )
    }

    /// Returns true for calls issued by the recovery coordinator.
    pub fn is_recovery(&self) -> bool {
        matches!(
            self,
            RequestType::SubmitRecoveryRequest | RequestType::GetRecoveryResult
        )
    }

    /// Returns true for state-changing single-pack calls, which are
    /// subject to repeated-request suppression.
    pub fn is_state_change(&self) -> bool {
        matches!(
            self,
            RequestType::SupplyPack | RequestType::DecommissionPack | RequestType::ReactivatePack
        )
    }
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RequestType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "verify_pack" => Ok(RequestType::VerifyPack),
            "supply_pack" => Ok(RequestType::SupplyPack),
            "decommission_pack" => Ok(RequestType::DecommissionPack),
            "reactivate_pack" => Ok(RequestType::ReactivatePack),
            "submit_bulk_request" => Ok(RequestType::SubmitBulkRequest),
            "get_bulk_result" => Ok(RequestType::GetBulkResult),
            "submit_recovery_request" => Ok(RequestType::SubmitRecoveryRequest),
            "get_recovery_result" => Ok(RequestType::GetRecoveryResult),
            _ => Err(Error::InvalidRequestType(s.to_string())),
        }
    }
}

/// An outbound call that could not be completed synchronously.
///
/// `timestamp` is unique and totally ordered: it is both the record key and
/// the delivery order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeferredRequest {
    pub timestamp: i64,
    pub verb: Verb,
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Stored as text; unparseable values are treated as "no transition".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_state: Option<String>,
    #[serde(default)]
    pub is_manual: bool,
    pub language: String,
    #[serde(default)]
    pub acknowledged: bool,
}

impl DeferredRequest {
    /// Returns the requested state, or `None` when absent or malformed.
    pub fn requested_pack_state(&self) -> Option<PackState> {
        PackState::parse_lenient(self.requested_state.as_deref())
    }
}

/// The authoritative result of a previously deferred request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoverySinglePackResponse {
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_state: Option<PackState>,
    #[serde(default)]
    pub is_manual: bool,
    pub pack: Pack,
    pub result: PackResult,
    pub severity: Severity,
}

impl RecoverySinglePackResponse {
    /// Pairs a deferred request with the result the remote returned for it.
    pub fn pair(timestamp: i64, request: &DeferredRequest, outcome: PackOutcome) -> Self {
        let severity = Severity::of(&outcome.result);
        RecoverySinglePackResponse {
            timestamp,
            requested_state: request.requested_pack_state().or(outcome.requested_state),
            is_manual: request.is_manual,
            pack: outcome.pack,
            result: outcome.result,
            severity,
        }
    }
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
