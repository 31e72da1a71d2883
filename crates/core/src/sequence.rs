// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Monotonic timestamps for store-and-forward records.
//!
//! Timestamps are microseconds since the Unix epoch, bumped by one whenever
//! the wall clock stalls or goes backwards, so every value handed out is
//! unique and strictly greater than the previous one. They serve as both
//! the primary key and the FIFO ordering key of stored records.

use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

/// Trait for getting the current wall clock time.
///
/// This allows injecting a mock clock for testing.
pub trait ClockSource: Send + Sync {
    /// Returns the current time in microseconds since Unix epoch.
    fn now_micros(&self) -> i64;
}

/// System clock implementation using `std::time::SystemTime`.
#[derive(Debug, Default)]
pub struct SystemClock;

impl ClockSource for SystemClock {
    fn now_micros(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| i64::try_from(d.as_micros()).unwrap_or(i64::MAX))
            .unwrap_or(0)
    }
}

/// A generator of strictly increasing timestamps.
///
/// Thread-safe; tolerates the wall clock going backwards.
pub struct SequenceClock<C: ClockSource = SystemClock> {
    clock: C,
    last: Mutex<i64>,
}

impl SequenceClock<SystemClock> {
    /// Creates a sequence clock backed by the system clock.
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for SequenceClock<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: ClockSource> SequenceClock<C> {
    /// Creates a sequence clock with a custom clock source.
    pub fn with_clock(clock: C) -> Self {
        SequenceClock {
            clock,
            last: Mutex::new(0),
        }
    }

    /// Returns the next timestamp.
    pub fn next(&self) -> i64 {
        let physical = self.clock.now_micros();
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        let value = if physical > *last {
            physical
        } else {
            last.saturating_add(1)
        };
        *last = value;
        value
    }

    /// Records a timestamp issued elsewhere (e.g. loaded from disk) so that
    /// later values are strictly greater.
    pub fn observe(&self, value: i64) {
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        if value > *last {
            *last = value;
        }
    }
}

#[cfg(test)]
#[path = "sequence_tests.rs"]
mod tests;
