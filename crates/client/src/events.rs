// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Listener lists for client notifications.
//!
//! Listeners run synchronously, in registration order, on the thread that
//! raised the event. They have no error channel, so a listener cannot abort
//! the operation that raised the event.

use std::sync::{Arc, Mutex};

use pt_core::{DeferredRequest, RequestType};

type Listener<E> = Arc<dyn Fn(&mut E) + Send + Sync>;

/// An ordered list of subscribers to one event type.
pub struct Listeners<E> {
    listeners: Mutex<Vec<Listener<E>>>,
}

impl<E> Default for Listeners<E> {
    fn default() -> Self {
        Listeners {
            listeners: Mutex::new(Vec::new()),
        }
    }
}

impl<E> Listeners<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: impl Fn(&mut E) + Send + Sync + 'static) {
        self.listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(Arc::new(listener));
    }

    /// Invokes every listener in order.
    ///
    /// The list is copied first so a listener may subscribe further
    /// listeners without deadlocking; those only see later events.
    pub fn emit(&self, event: &mut E) {
        let listeners: Vec<Listener<E>> = self
            .listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        for listener in listeners {
            listener(event);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The client switched between online and offline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeChanged {
    pub offline: bool,
}

/// A request is about to be deferred.
///
/// Setting `cancel` stops the deferral; nothing is persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeferringRequest {
    pub request_type: RequestType,
    pub request: DeferredRequest,
    pub reason: String,
    pub cancel: bool,
}

/// Store-and-forward counters, emitted once per coordinator cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Statistics {
    /// Deferred requests not yet accepted by the remote.
    pub pending: usize,
    /// Recovered responses awaiting collection.
    pub completed: usize,
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod tests;
