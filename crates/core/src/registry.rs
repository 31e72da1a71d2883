// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Process-wide coordination state shared by every client instance.
//!
//! Holds the drain-leadership map (store name → "an instance is draining")
//! and one sequence clock per store name. Tests create their own registry;
//! applications normally share [`Registry::global`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use crate::sequence::SequenceClock;

static GLOBAL: OnceLock<Arc<Registry>> = OnceLock::new();

/// Shared leadership and timestamp state.
#[derive(Default)]
pub struct Registry {
    draining: Mutex<HashMap<String, bool>>,
    clocks: Mutex<HashMap<String, Arc<SequenceClock>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry shared by all clients in this process.
    pub fn global() -> Arc<Registry> {
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(Registry::new())))
    }

    /// Claims drain leadership for `store`.
    ///
    /// Succeeds when no entry exists or the entry is `false`, and sets it to
    /// `true`. The check and the set happen under one lock.
    pub fn try_acquire(&self, store: &str) -> bool {
        let mut draining = self.draining.lock().unwrap_or_else(|e| e.into_inner());
        match draining.get(store) {
            Some(true) => false,
            _ => {
                draining.insert(store.to_string(), true);
                true
            }
        }
    }

    /// Gives up drain leadership for `store`.
    pub fn release(&self, store: &str) {
        let mut draining = self.draining.lock().unwrap_or_else(|e| e.into_inner());
        draining.insert(store.to_string(), false);
    }

    /// Returns true if some instance currently drains `store`.
    pub fn is_draining(&self, store: &str) -> bool {
        let draining = self.draining.lock().unwrap_or_else(|e| e.into_inner());
        draining.get(store).copied().unwrap_or(false)
    }

    /// The sequence clock shared by every table of `store`.
    pub fn clock(&self, store: &str) -> Arc<SequenceClock> {
        let mut clocks = self.clocks.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(
            clocks
                .entry(store.to_string())
                .or_insert_with(|| Arc::new(SequenceClock::new())),
        )
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
