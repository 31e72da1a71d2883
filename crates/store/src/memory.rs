// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Memory-backed store.
//!
//! A store built with [`MemoryStore::new`] belongs to one client. One built
//! with [`MemoryStore::shared`] draws its clock from the registry under a
//! store name; clients handed the same `Arc<MemoryStore>` see the same
//! records and compete for drain leadership under that name.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use pt_core::{DeferredRequest, RecoverySinglePackResponse, Registry, SequenceClock};

use crate::error::StoreResult;
use crate::table::MemoryTable;
use crate::{Store, Table};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

pub struct MemoryStore {
    name: String,
    per_instance: bool,
    requests: MemoryTable<DeferredRequest>,
    responses: MemoryTable<RecoverySinglePackResponse>,
}

impl MemoryStore {
    /// Creates a store private to one client.
    pub fn new() -> Self {
        let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        Self::build(format!("memory-{id}"), true, Arc::new(SequenceClock::new()))
    }

    /// Creates a store that may be shared by several clients under `name`.
    pub fn shared(name: impl Into<String>, registry: &Registry) -> Self {
        let name = name.into();
        let clock = registry.clock(&name);
        Self::build(name, false, clock)
    }

    fn build(name: String, per_instance: bool, clock: Arc<SequenceClock>) -> Self {
        MemoryStore {
            name,
            per_instance,
            requests: MemoryTable::new(Arc::clone(&clock)),
            responses: MemoryTable::new(clock),
        }
    }

    fn set_acknowledged(&self, requests: &[DeferredRequest], value: bool) -> StoreResult<()> {
        let stamps: Vec<i64> = requests.iter().map(|r| r.timestamp).collect();
        self.requests.update(&stamps, |r| r.acknowledged = value)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Store for MemoryStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn per_instance(&self) -> bool {
        self.per_instance
    }

    fn requests(&self) -> &dyn Table<DeferredRequest> {
        &self.requests
    }

    fn responses(&self) -> &dyn Table<RecoverySinglePackResponse> {
        &self.responses
    }

    fn acknowledge_requests(&self, requests: &[DeferredRequest]) -> StoreResult<()> {
        self.set_acknowledged(requests, true)
    }

    fn release_requests(&self, requests: &[DeferredRequest]) -> StoreResult<()> {
        self.set_acknowledged(requests, false)
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
