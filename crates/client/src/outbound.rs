// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Wire-level requests, validated when they are built.

use pt_core::codes;
use pt_core::{
    validate_bulk, validate_command, validate_pack, BulkRequest, PackCommand, PackState,
    RecoveryRequest, RequestType, Validation, Verb,
};

use crate::endpoints::{state_body, Endpoints};
use crate::error::Result;

/// One logical call, ready for the execution engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    pub verb: Verb,
    pub uri: String,
    pub body: Option<String>,
    pub requested_state: Option<PackState>,
    pub is_manual: bool,
    pub language: String,
    pub request_type: RequestType,
    /// Local pre-flight result; a rejection means the call is never sent.
    pub validation: Validation,
}

impl Outbound {
    /// A single-pack verify, supply, decommission or reactivate call.
    pub fn single(
        endpoints: &Endpoints,
        command: &PackCommand,
        request_type: RequestType,
        language: &str,
    ) -> Self {
        let validation = match request_type {
            RequestType::VerifyPack => validate_pack(&command.pack),
            _ => validate_command(command, request_type),
        };
        let (verb, requested_state) = match request_type {
            RequestType::VerifyPack => (Verb::Get, None),
            _ => (Verb::Patch, command.requested_state),
        };
        Outbound {
            verb,
            uri: endpoints.pack(&command.pack),
            body: requested_state.map(state_body),
            requested_state,
            is_manual: command.is_manual,
            language: language.to_string(),
            request_type,
            validation,
        }
    }

    pub fn bulk(
        endpoints: &Endpoints,
        bulk: &BulkRequest,
        max_packs: usize,
        language: &str,
    ) -> Result<Self> {
        Ok(Outbound {
            verb: Verb::Post,
            uri: endpoints.bulk(),
            body: Some(serde_json::to_string(bulk)?),
            requested_state: bulk.requested_state,
            is_manual: bulk.is_manual,
            language: language.to_string(),
            request_type: RequestType::SubmitBulkRequest,
            validation: validate_bulk(bulk, max_packs),
        })
    }

    pub fn bulk_result(location: &str, language: &str) -> Self {
        Self::fetch(location, language, RequestType::GetBulkResult)
    }

    pub fn recovery(
        endpoints: &Endpoints,
        recovery: &RecoveryRequest,
        language: &str,
    ) -> Result<Self> {
        let validation = if recovery.packs.is_empty() {
            Validation::reject(codes::EMPTY_BULK, "recovery request contains no packs")
        } else {
            Validation::ok()
        };
        Ok(Outbound {
            verb: Verb::Post,
            uri: endpoints.recovery(),
            body: Some(serde_json::to_string(recovery)?),
            requested_state: None,
            is_manual: false,
            language: language.to_string(),
            request_type: RequestType::SubmitRecoveryRequest,
            validation,
        })
    }

    pub fn recovery_result(location: &str, language: &str) -> Self {
        Self::fetch(location, language, RequestType::GetRecoveryResult)
    }

    fn fetch(location: &str, language: &str, request_type: RequestType) -> Self {
        let validation = if location.trim().is_empty() {
            Validation::reject(codes::MISSING_LOCATION, "result location is empty")
        } else {
            Validation::ok()
        };
        Outbound {
            verb: Verb::Get,
            uri: location.trim().to_string(),
            body: None,
            requested_state: None,
            is_manual: false,
            language: language.to_string(),
            request_type,
            validation,
        }
    }
}

#[cfg(test)]
#[path = "outbound_tests.rs"]
mod tests;
