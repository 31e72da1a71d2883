// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Online/offline mode of one client instance.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::events::{Listeners, ModeChanged};

/// The client's offline flag and its change notifications.
///
/// Transitions are serialized so listeners observe them in the order they
/// happened, and a transition to the current mode notifies nobody.
#[derive(Default)]
pub struct ClientMode {
    offline: AtomicBool,
    transition: Mutex<()>,
    listeners: Listeners<ModeChanged>,
}

impl ClientMode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_offline(&self) -> bool {
        self.offline.load(Ordering::Acquire)
    }

    pub fn listeners(&self) -> &Listeners<ModeChanged> {
        &self.listeners
    }

    /// Switches to offline. Returns true if this call made the change.
    pub fn go_offline(&self) -> bool {
        self.set(true)
    }

    /// Switches to online. Returns true if this call made the change.
    pub fn go_online(&self) -> bool {
        self.set(false)
    }

    fn set(&self, offline: bool) -> bool {
        if self.is_offline() == offline {
            return false;
        }
        let _guard = self.transition.lock().unwrap_or_else(|e| e.into_inner());
        if self.offline.swap(offline, Ordering::AcqRel) == offline {
            return false;
        }
        tracing::info!(offline, "client mode changed");
        self.listeners.emit(&mut ModeChanged { offline });
        true
    }
}

#[cfg(test)]
#[path = "mode_tests.rs"]
mod tests;
