// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Per-caller transactions and the in-memory table.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};

use pt_core::SequenceClock;

use crate::error::{StoreError, StoreResult};
use crate::{Record, Table};

/// A pending change to a table.
#[derive(Debug, Clone)]
pub enum Change<R> {
    Add(R),
    Remove(i64),
}

/// Changes staged by one caller against one table.
///
/// Nothing is visible to [`Table::list`] until [`Transaction::commit`].
/// A failed commit leaves the changes staged so the caller can roll back.
#[must_use = "staged changes are lost unless committed"]
pub struct Transaction<'a, R: Record> {
    table: &'a dyn Table<R>,
    changes: Vec<Change<R>>,
}

impl<'a, R: Record> Transaction<'a, R> {
    pub fn new(table: &'a dyn Table<R>) -> Self {
        Transaction {
            table,
            changes: Vec::new(),
        }
    }

    pub fn add(&mut self, record: R) {
        self.changes.push(Change::Add(record));
    }

    pub fn remove(&mut self, record: &R) {
        self.changes.push(Change::Remove(record.timestamp()));
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn commit(&mut self) -> StoreResult<()> {
        if self.changes.is_empty() {
            return Ok(());
        }
        self.table.commit(&self.changes)?;
        self.changes.clear();
        Ok(())
    }

    pub fn rollback(&mut self) -> StoreResult<()> {
        let changes = std::mem::take(&mut self.changes);
        if changes.is_empty() {
            return Ok(());
        }
        self.table.rollback(&changes)
    }
}

/// Checks a batch of changes against the keys currently present.
///
/// Adds must not collide with a present key and removes must name one.
/// Changes are applied in order, so a record added and removed in the
/// same batch is fine.
pub fn check_changes<R: Record>(
    present: &mut HashSet<i64>,
    changes: &[Change<R>],
) -> StoreResult<()> {
    for change in changes {
        match change {
            Change::Add(record) => {
                if !present.insert(record.timestamp()) {
                    return Err(StoreError::DuplicateTimestamp(record.timestamp()));
                }
            }
            Change::Remove(timestamp) => {
                if !present.remove(timestamp) {
                    return Err(StoreError::RecordNotFound(*timestamp));
                }
            }
        }
    }
    Ok(())
}

/// An in-memory table. Each commit is checked and applied under one lock.
pub struct MemoryTable<R: Record> {
    committed: Mutex<BTreeMap<i64, R>>,
    clock: Arc<SequenceClock>,
}

impl<R: Record> MemoryTable<R> {
    pub fn new(clock: Arc<SequenceClock>) -> Self {
        MemoryTable {
            committed: Mutex::new(BTreeMap::new()),
            clock,
        }
    }

    /// Updates committed records in place, outside any transaction.
    ///
    /// Fails without touching anything if a timestamp is absent.
    pub fn update(&self, timestamps: &[i64], f: impl Fn(&mut R)) -> StoreResult<()> {
        let mut committed = self.committed.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(missing) = timestamps.iter().find(|ts| !committed.contains_key(ts)) {
            return Err(StoreError::RecordNotFound(*missing));
        }
        for timestamp in timestamps {
            if let Some(record) = committed.get_mut(timestamp) {
                f(record);
            }
        }
        Ok(())
    }
}

impl<R: Record> Table<R> for MemoryTable<R> {
    fn list(&self) -> StoreResult<Vec<R>> {
        let committed = self.committed.lock().unwrap_or_else(|e| e.into_inner());
        Ok(committed.values().cloned().collect())
    }

    fn current_timestamp(&self) -> StoreResult<i64> {
        Ok(self.clock.next())
    }

    fn commit(&self, changes: &[Change<R>]) -> StoreResult<()> {
        let mut committed = self.committed.lock().unwrap_or_else(|e| e.into_inner());
        let mut present: HashSet<i64> = committed.keys().copied().collect();
        check_changes(&mut present, changes)?;

        for change in changes {
            match change {
                Change::Add(record) => {
                    committed.insert(record.timestamp(), record.clone());
                }
                Change::Remove(timestamp) => {
                    committed.remove(timestamp);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "table_tests.rs"]
mod tests;
