// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Bulk and recovery payloads.

use serde::{Deserialize, Serialize};

use crate::pack::{Pack, PackCommand};
use crate::result::PackResult;
use crate::state::PackState;

/// An asynchronous bulk request over many packs.
///
/// When `requested_state` is set every pack is transitioned into it;
/// otherwise the bulk is a verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkRequest {
    pub packs: Vec<Pack>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_state: Option<PackState>,
    #[serde(default)]
    pub is_manual: bool,
}

impl BulkRequest {
    pub fn verify(packs: Vec<Pack>) -> Self {
        BulkRequest {
            packs,
            requested_state: None,
            is_manual: false,
        }
    }

    pub fn transition(packs: Vec<Pack>, state: PackState) -> Self {
        BulkRequest {
            packs,
            requested_state: Some(state),
            is_manual: false,
        }
    }

    /// Explodes the bulk into one command per pack.
    pub fn commands(&self) -> Vec<PackCommand> {
        self.packs
            .iter()
            .map(|pack| PackCommand {
                pack: pack.clone(),
                requested_state: self.requested_state,
                is_manual: self.is_manual,
            })
            .collect()
    }
}

/// A batch of previously deferred commands submitted for recovery.
///
/// Order is significant: results come back in the same order and are
/// paired positionally with the deferred requests they were built from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryRequest {
    pub packs: Vec<PackCommand>,
}

/// The per-pack result inside a bulk or recovery result set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackOutcome {
    pub pack: Pack,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_state: Option<PackState>,
    #[serde(default)]
    pub is_manual: bool,
    #[serde(default)]
    pub result: PackResult,
}
